//! Database repository for construction tasks.
//!
//! Tasks are stored flat, keyed by id, with a `(project_id, unit, position)`
//! index preserving per-unit order. Updates merge individual columns and
//! append photo rows, so two writers touching different fields (or both
//! uploading photos) never overwrite each other.

use anyhow::Result;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{NewTask, PhotoSide, Task, TaskPatch};

const TASK_COLUMNS: &str = "t.id, t.project_id, t.unit, t.position, t.contractor_id, t.title, \
     t.description, t.status_for_contractor, t.status_for_site_incharge, t.progress_percentage, \
     t.is_approved_by_contractor, t.is_approved_by_site_manager, t.construction_phase, t.deadline, \
     t.priority, t.quality_assessment, t.verification_decision, t.evidence_title, \
     t.site_incharge_note, t.submitted_by_contractor_on, t.submitted_by_site_incharge_on, \
     t.version, t.created_at, t.updated_at";

/// Repository for task database operations.
pub struct TaskRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> TaskRepository<'a> {
    /// Creates a new TaskRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends a task to the end of its unit and adds the contractor to the
    /// project roster in one transaction. When `quality_issue_id` is given,
    /// the issue's contractor is pointed at the same contractor.
    ///
    /// # Arguments
    /// * `task` - Initial task fields
    /// * `quality_issue_id` - Optional quality issue to re-point
    ///
    /// # Returns
    /// The stored task in its initial state
    pub async fn insert_task(&self, task: &NewTask, quality_issue_id: Option<&str>) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let id = Uuid::now_v7().to_string();

        // The insert must be the first statement: a deferred transaction that
        // reads first cannot upgrade its WAL snapshot once another writer commits.
        sqlx::query(
            "INSERT INTO tasks (id, project_id, unit, position, contractor_id, title, description, \
             construction_phase, deadline, priority, created_at, updated_at) \
             SELECT ?, ?, ?, COALESCE(MAX(position), -1) + 1, ?, ?, ?, ?, ?, ?, ?, ? \
             FROM tasks WHERE project_id = ? AND unit = ?",
        )
        .bind(&id)
        .bind(&task.project_id)
        .bind(&task.unit)
        .bind(&task.contractor_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.construction_phase)
        .bind(task.deadline)
        .bind(task.priority)
        .bind(now)
        .bind(now)
        .bind(&task.project_id)
        .bind(&task.unit)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO project_contractors (project_id, contractor_id, added_at) \
             VALUES (?, ?, ?)",
        )
        .bind(&task.project_id)
        .bind(&task.contractor_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(issue_id) = quality_issue_id {
            sqlx::query("UPDATE quality_issues SET contractor_id = ?, updated_at = ? WHERE id = ?")
                .bind(&task.contractor_id)
                .bind(now)
                .bind(issue_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(&task.project_id)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t WHERE t.id = ?",
            TASK_COLUMNS
        ))
        .bind(&id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Retrieves a task by ID, including both photo lists.
    ///
    /// # Returns
    /// `Some(Task)` if found, `None` otherwise
    pub async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t WHERE t.id = ?",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match task {
            Some(task) => Ok(self.attach_photos(vec![task]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Lists the tasks of a project ordered by unit then position.
    pub async fn get_tasks_by_project(&self, project_id: &str) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t WHERE t.project_id = ? ORDER BY t.unit, t.position",
            TASK_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_photos(tasks).await
    }

    /// Lists every task assigned to `contractor_id`.
    pub async fn get_tasks_by_contractor(&self, contractor_id: &str) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t WHERE t.contractor_id = ? \
             ORDER BY t.project_id, t.unit, t.position",
            TASK_COLUMNS
        ))
        .bind(contractor_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_photos(tasks).await
    }

    /// Lists tasks in projects supervised by `site_incharge_id` that the
    /// contractor has completed and submitted.
    pub async fn get_tasks_awaiting_site_incharge(&self, site_incharge_id: &str) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t JOIN projects p ON p.id = t.project_id \
             WHERE p.site_incharge_id = ? AND t.is_approved_by_contractor = 1 \
             AND t.status_for_contractor = 'completed' \
             ORDER BY t.project_id, t.unit, t.position",
            TASK_COLUMNS
        ))
        .bind(site_incharge_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_photos(tasks).await
    }

    /// Lists the contractor's tasks in projects supervised by `site_incharge_id`.
    pub async fn get_contractor_tasks_under_site_incharge(
        &self,
        site_incharge_id: &str,
        contractor_id: &str,
    ) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t JOIN projects p ON p.id = t.project_id \
             WHERE p.site_incharge_id = ? AND t.contractor_id = ? \
             ORDER BY t.project_id, t.unit, t.position",
            TASK_COLUMNS
        ))
        .bind(site_incharge_id)
        .bind(contractor_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_photos(tasks).await
    }

    /// Lists every task.
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t ORDER BY t.project_id, t.unit, t.position",
            TASK_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        self.attach_photos(tasks).await
    }

    /// Merges `patch` into the task and appends its photos.
    ///
    /// # Returns
    /// The updated task, or `None` if it does not exist
    pub async fn apply_patch(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE tasks SET \
             progress_percentage = COALESCE(?, progress_percentage), \
             construction_phase = COALESCE(?, construction_phase), \
             status_for_contractor = COALESCE(?, status_for_contractor), \
             status_for_site_incharge = COALESCE(?, status_for_site_incharge), \
             is_approved_by_contractor = COALESCE(?, is_approved_by_contractor), \
             is_approved_by_site_manager = COALESCE(?, is_approved_by_site_manager), \
             quality_assessment = COALESCE(?, quality_assessment), \
             verification_decision = COALESCE(?, verification_decision), \
             evidence_title = COALESCE(?, evidence_title), \
             site_incharge_note = COALESCE(?, site_incharge_note), \
             submitted_by_contractor_on = COALESCE(?, submitted_by_contractor_on), \
             submitted_by_site_incharge_on = COALESCE(?, submitted_by_site_incharge_on), \
             version = version + 1, updated_at = ? \
             WHERE id = ?",
        )
        .bind(patch.progress_percentage)
        .bind(&patch.construction_phase)
        .bind(patch.status_for_contractor)
        .bind(patch.status_for_site_incharge)
        .bind(patch.is_approved_by_contractor)
        .bind(patch.is_approved_by_site_manager)
        .bind(patch.quality_assessment)
        .bind(patch.verification_decision)
        .bind(&patch.evidence_title)
        .bind(&patch.site_incharge_note)
        .bind(patch.submitted_by_contractor_on)
        .bind(patch.submitted_by_site_incharge_on)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let photos = patch
            .contractor_photos
            .iter()
            .map(|url| (PhotoSide::Contractor, url))
            .chain(
                patch
                    .site_incharge_photos
                    .iter()
                    .map(|url| (PhotoSide::SiteIncharge, url)),
            );

        for (side, url) in photos {
            sqlx::query(
                "INSERT INTO task_photos (task_id, uploaded_by, url, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(side)
            .bind(url)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get_task_by_id(id).await
    }

    /// Fills both photo lists for `tasks` with one query.
    async fn attach_photos(&self, mut tasks: Vec<Task>) -> Result<Vec<Task>> {
        if tasks.is_empty() {
            return Ok(tasks);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT task_id, uploaded_by, url FROM task_photos WHERE task_id IN (");
        let mut separated = builder.separated(", ");
        for task in &tasks {
            separated.push_bind(task.id.clone());
        }
        separated.push_unseparated(") ORDER BY id");

        let rows: Vec<(String, PhotoSide, String)> =
            builder.build_query_as().fetch_all(self.pool).await?;

        let mut by_task: HashMap<String, Vec<(PhotoSide, String)>> = HashMap::new();
        for (task_id, side, url) in rows {
            by_task.entry(task_id).or_default().push((side, url));
        }

        for task in &mut tasks {
            if let Some(photos) = by_task.remove(&task.id) {
                for (side, url) in photos {
                    match side {
                        PhotoSide::Contractor => task.contractor_uploaded_photos.push(url),
                        PhotoSide::SiteIncharge => task.site_incharge_uploaded_photos.push(url),
                    }
                }
            }
        }

        Ok(tasks)
    }
}
