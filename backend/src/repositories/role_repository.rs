//! Database repository for role management operations.
//!
//! Provides access to named roles and their ordered permission entries:
//! - Role lookup by ID or name
//! - Create, update, upsert and delete
//! - Listing with per-role user counts
use anyhow::Result;
use chrono::Utc;
use sqlx::{SqlitePool, types::Json};
use uuid::Uuid;

use crate::database::models::{PermissionEntry, Role, RoleWithUserCount};

const ROLE_COLUMNS: &str = "id, name, description, color, permissions, created_at, updated_at";

/// Repository for role database operations.
///
/// Names are expected to arrive already normalised (trimmed, lowercased);
/// the UNIQUE index on `name` backs up the service-level duplicate check.
pub struct RoleRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> RoleRepository<'a> {
    /// Creates a new RoleRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Retrieves a role by its unique identifier.
    ///
    /// # Arguments
    /// * `id` - Role ID (UUID format)
    ///
    /// # Returns
    /// `Some(Role)` if found, `None` otherwise
    pub async fn get_role_by_id(&self, id: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {} FROM roles WHERE id = ?",
            ROLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }

    /// Retrieves a role by its exact name.
    ///
    /// # Arguments
    /// * `name` - Exact role name to search for
    ///
    /// # Returns
    /// `Some(Role)` if found, `None` otherwise
    pub async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {} FROM roles WHERE name = ?",
            ROLE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }

    /// Checks whether a role other than `exclude_id` already uses `name`,
    /// ignoring case.
    pub async fn name_taken(&self, name: &str, exclude_id: Option<&str>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roles WHERE lower(name) = lower(?) AND id IS NOT ?",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Retrieves all roles ordered by name.
    pub async fn get_all_roles(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {} FROM roles ORDER BY name",
            ROLE_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(roles)
    }

    /// Lists every role with the number of users referencing it.
    pub async fn get_roles_with_user_count(&self) -> Result<Vec<RoleWithUserCount>> {
        let roles = self.get_all_roles().await?;

        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT role_id, COUNT(*) FROM users WHERE role_id IS NOT NULL GROUP BY role_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(roles
            .into_iter()
            .map(|role| {
                let user_count = counts
                    .iter()
                    .find(|(role_id, _)| *role_id == role.id)
                    .map(|(_, count)| *count)
                    .unwrap_or(0);
                RoleWithUserCount { role, user_count }
            })
            .collect())
    }

    /// Inserts a new role.
    pub async fn create_role(
        &self,
        name: &str,
        description: &str,
        color: &str,
        permissions: &[PermissionEntry],
    ) -> Result<Role> {
        let now = Utc::now();

        let role = sqlx::query_as::<_, Role>(&format!(
            "INSERT INTO roles (id, name, description, color, permissions, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            ROLE_COLUMNS
        ))
        .bind(Uuid::now_v7().to_string())
        .bind(name)
        .bind(description)
        .bind(color)
        .bind(Json(permissions))
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(role)
    }

    /// Updates the provided fields of a role. A rename is copied onto the
    /// denormalised `role_name` of every user holding the role, in the same
    /// transaction.
    ///
    /// # Returns
    /// The updated role, or `None` if it does not exist
    pub async fn update_role(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        color: Option<&str>,
        permissions: Option<&[PermissionEntry]>,
    ) -> Result<Option<Role>> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let role = sqlx::query_as::<_, Role>(&format!(
            "UPDATE roles SET name = COALESCE(?, name), description = COALESCE(?, description), \
             color = COALESCE(?, color), permissions = COALESCE(?, permissions), updated_at = ? \
             WHERE id = ? RETURNING {}",
            ROLE_COLUMNS
        ))
        .bind(name)
        .bind(description)
        .bind(color)
        .bind(permissions.map(Json))
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let (Some(role), Some(_)) = (&role, name) {
            sqlx::query("UPDATE users SET role_name = ?, updated_at = ? WHERE role_id = ?")
                .bind(&role.name)
                .bind(now)
                .bind(&role.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(role)
    }

    /// Deletes a role. Users keep their now-dangling role reference.
    pub async fn delete_role(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
