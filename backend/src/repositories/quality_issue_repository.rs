//! Database repository for quality issues raised against project units.
//!
//! Issues are raised by site staff, re-pointed at a contractor by the task
//! assignment flow and moved between open, under review and resolved.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::{CreateQualityIssue, IssueStatus, QualityIssue};

const ISSUE_COLUMNS: &str = "id, project_id, unit, title, severity, status, contractor_id, \
     reported_by, description, created_at, updated_at";

pub struct QualityIssueRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> QualityIssueRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Records a new open issue with no contractor attached.
    pub async fn create_issue(&self, issue: &CreateQualityIssue) -> Result<QualityIssue> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, QualityIssue>(&format!(
            "INSERT INTO quality_issues (id, project_id, unit, title, severity, status, \
             reported_by, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            ISSUE_COLUMNS
        ))
        .bind(Uuid::now_v7().to_string())
        .bind(&issue.project_id)
        .bind(&issue.unit)
        .bind(&issue.title)
        .bind(issue.severity)
        .bind(IssueStatus::Open)
        .bind(&issue.reported_by)
        .bind(&issue.description)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_issue_by_id(&self, id: &str) -> Result<Option<QualityIssue>> {
        let issue = sqlx::query_as::<_, QualityIssue>(&format!(
            "SELECT {} FROM quality_issues WHERE id = ?",
            ISSUE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(issue)
    }

    /// Issues the user reported or is assigned to fix, newest first.
    pub async fn get_issues_for_user(&self, user_id: &str) -> Result<Vec<QualityIssue>> {
        let issues = sqlx::query_as::<_, QualityIssue>(&format!(
            "SELECT {} FROM quality_issues WHERE reported_by = ? OR contractor_id = ? \
             ORDER BY created_at DESC, id DESC",
            ISSUE_COLUMNS
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(issues)
    }

    /// # Returns
    /// The updated issue, or `None` if it does not exist
    pub async fn update_status(&self, id: &str, status: IssueStatus) -> Result<Option<QualityIssue>> {
        let issue = sqlx::query_as::<_, QualityIssue>(&format!(
            "UPDATE quality_issues SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
            ISSUE_COLUMNS
        ))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(issue)
    }
}
