//! Database repository for user management operations.
//!
//! Provides CRUD operations for system users plus the compare-and-set
//! update that rotates a user's single live session token.

use crate::{
    api::common::PaginationFilter,
    database::models::{CreateUser, UpdateUserRequest, User, UserStatus},
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, role_name, role_id, status, phone, \
     company, specialization, current_session_token, last_login, created_at, updated_at";

/// Repository for user database operations.
///
/// Handles all persistence operations for the User entity,
/// keeping the role reference weak (no cascade).
pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new user in the database.
    ///
    /// # Arguments
    /// * `user` - CreateUser DTO containing user details
    ///
    /// # Returns
    /// The newly created User with all fields populated
    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role_name, role_id, status, \
             phone, company, specialization, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role_name)
        .bind(&user.role_id)
        .bind(user.status)
        .bind(&user.phone)
        .bind(&user.company)
        .bind(&user.specialization)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }

    /// Retrieves a user by ID.
    ///
    /// # Arguments
    /// * `id` - User ID
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves a user by email. Emails are stored lowercased.
    ///
    /// # Arguments
    /// * `email` - Email address
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Checks if an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Lists users other than `exclude_user_id`, newest first.
    ///
    /// # Returns
    /// One page of users and the total count of matching users
    pub async fn list_users_excluding(
        &self,
        exclude_user_id: &str,
        pagination: &PaginationFilter,
    ) -> Result<(Vec<User>, u64)> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id != ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS
        ))
        .bind(exclude_user_id)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id != ?")
            .bind(exclude_user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((users, total as u64))
    }

    /// Lists every user holding the role named `role_name`.
    pub async fn get_users_by_role_name(&self, role_name: &str) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE role_name = ? ORDER BY name",
            USER_COLUMNS
        ))
        .bind(role_name)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Applies the provided profile fields, leaving the others untouched.
    ///
    /// # Returns
    /// The updated user, or `None` if it does not exist
    pub async fn update_profile(&self, id: &str, update: &UpdateUserRequest) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = COALESCE(?, name), phone = COALESCE(?, phone), \
             company = COALESCE(?, company), specialization = COALESCE(?, specialization), \
             updated_at = ? WHERE id = ? RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.company)
        .bind(&update.specialization)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Sets the account status.
    pub async fn update_status(&self, id: &str, status: UserStatus) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
            USER_COLUMNS
        ))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Replaces the stored password hash.
    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically replaces the live session token, but only if it still
    /// equals `expected`. `None` matches a user with no live session.
    ///
    /// # Arguments
    /// * `id` - User ID
    /// * `expected` - Token observed before the swap
    /// * `new_token` - Token to install, or `None` to clear the session
    /// * `login_at` - When set, also recorded as `last_login`
    ///
    /// # Returns
    /// `true` if the swap happened, `false` if another writer got there first
    pub async fn swap_session_token(
        &self,
        id: &str,
        expected: Option<&str>,
        new_token: Option<&str>,
        login_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET current_session_token = ?, \
             last_login = COALESCE(?, last_login), updated_at = ? \
             WHERE id = ? AND current_session_token IS ?",
        )
        .bind(new_token)
        .bind(login_at)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes a user. References held elsewhere are left dangling.
    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
