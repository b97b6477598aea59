//! Database repository for the per-user notification inbox.

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::database::models::Notification;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, message, data, triggered_by, is_read, created_at";

/// Repository for notification database operations.
pub struct NotificationRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> NotificationRepository<'a> {
    /// Creates a new NotificationRepository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Stores a notification exactly as it was built, id and timestamp
    /// included, so the pushed copy and the stored copy match.
    pub async fn create_notification(&self, notification: &Notification) -> Result<Notification> {
        let stored = sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, user_id, kind, title, message, data, triggered_by, \
             is_read, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(Json(&notification.data))
        .bind(&notification.triggered_by)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .fetch_one(self.pool)
        .await?;

        Ok(stored)
    }

    /// Every notification of a user, newest first.
    pub async fn get_notifications_by_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(notifications)
    }

    /// Unread notifications of a user, newest first.
    pub async fn get_unread_by_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE user_id = ? AND is_read = 0 \
             ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn count_unread(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Marks one notification read. Scoped to `user_id`, so another user's
    /// notification is reported as missing.
    ///
    /// # Returns
    /// The updated notification, or `None` if the user has no such entry
    pub async fn mark_read(&self, id: &str, user_id: &str) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ? RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(notification)
    }

    /// Marks every unread notification of a user read.
    ///
    /// # Returns
    /// Number of notifications that changed
    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
