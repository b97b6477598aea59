//! Database repository for construction projects.
//!
//! Covers the project row itself, its contractor roster and the per-unit
//! contractor assignments. Tasks live in their own table and are handled by
//! the task repository.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::models::{CreateProjectRequest, Project};

const PROJECT_COLUMNS: &str = "id, name, building_id, floor_unit_id, unit_id, site_incharge_id, \
     description, priority, deadline, created_at, updated_at";

/// Repository for project database operations.
pub struct ProjectRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> ProjectRepository<'a> {
    /// Creates a new ProjectRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a project and seeds its roster with `request.contractors`.
    ///
    /// # Returns
    /// The newly created Project
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let project = sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (id, name, building_id, floor_unit_id, unit_id, site_incharge_id, \
             description, priority, deadline, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(Uuid::now_v7().to_string())
        .bind(&request.name)
        .bind(&request.building_id)
        .bind(&request.floor_unit_id)
        .bind(&request.unit_id)
        .bind(&request.site_incharge_id)
        .bind(&request.description)
        .bind(request.priority)
        .bind(request.deadline)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for contractor_id in &request.contractors {
            sqlx::query(
                "INSERT OR IGNORE INTO project_contractors (project_id, contractor_id, added_at) \
                 VALUES (?, ?, ?)",
            )
            .bind(&project.id)
            .bind(contractor_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(project)
    }

    /// Retrieves a project by ID.
    ///
    /// # Returns
    /// `Some(Project)` if found, `None` otherwise
    pub async fn get_project_by_id(&self, id: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(project)
    }

    /// Lists every project, newest first.
    pub async fn get_all_projects(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(projects)
    }

    /// Lists projects supervised by `site_incharge_id`.
    pub async fn get_projects_by_site_incharge(&self, site_incharge_id: &str) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE site_incharge_id = ? ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(site_incharge_id)
        .fetch_all(self.pool)
        .await?;

        Ok(projects)
    }

    /// Lists projects whose roster contains `contractor_id`.
    pub async fn get_projects_by_contractor(&self, contractor_id: &str) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id IN \
             (SELECT project_id FROM project_contractors WHERE contractor_id = ?) \
             ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(contractor_id)
        .fetch_all(self.pool)
        .await?;

        Ok(projects)
    }

    /// Returns the contractor roster in the order contractors joined.
    pub async fn get_contractors(&self, project_id: &str) -> Result<Vec<String>> {
        let contractors = sqlx::query_scalar(
            "SELECT contractor_id FROM project_contractors WHERE project_id = ? \
             ORDER BY added_at, rowid",
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        Ok(contractors)
    }

    /// Returns unit name → contractors assigned to that unit.
    pub async fn get_unit_assignments(&self, project_id: &str) -> Result<BTreeMap<String, Vec<String>>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT unit, contractor_id FROM unit_assignments WHERE project_id = ? \
             ORDER BY unit, assigned_at, rowid",
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        let mut assignments: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (unit, contractor_id) in rows {
            assignments.entry(unit).or_default().push(contractor_id);
        }

        Ok(assignments)
    }

    /// Adds `contractor_id` to the roster and to `unit`'s assignment list.
    /// Both inserts ignore existing rows, so repeating the call is a no-op.
    pub async fn assign_contractor_to_unit(
        &self,
        project_id: &str,
        unit: &str,
        contractor_id: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            "INSERT OR IGNORE INTO project_contractors (project_id, contractor_id, added_at) \
             VALUES (?, ?, ?)",
        )
        .bind(project_id)
        .bind(contractor_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO unit_assignments (project_id, unit, contractor_id, assigned_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(unit)
        .bind(contractor_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
