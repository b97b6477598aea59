//! In-app notifications: a stored inbox per user plus live delivery to open
//! connections.
//!
//! Each user with an open stream owns a broadcast channel in the
//! [`NotificationHub`]. The workflow services go through a [`Notifier`]; the
//! default one stores the notification first and then pushes it, so users
//! who were offline still find it in their inbox.

use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast};
use validator::Validate;

use crate::auth::models::SessionUser;
use crate::database::models::{Notification, SendNotificationRequest};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::notification_repository::NotificationRepository;
use crate::repositories::user_repository::UserRepository;
use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 32;

/// Narrow delivery interface used by the workflow services.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `notification` to `notification.user_id`. Returns `true` if
    /// at least one live connection received it.
    async fn notify(&self, notification: Notification) -> bool;
}

#[derive(Default)]
pub struct NotificationHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Notification>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a raw receiver to the user's channel. The entry is only
    /// released by a later push or prune; streams should use [`Self::open`].
    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Opens a live connection for `user_id` that releases its channel entry
    /// when dropped.
    pub async fn open(self: &Arc<Self>, user_id: &str) -> Subscription {
        let receiver = self.subscribe(user_id).await;
        Subscription {
            hub: Arc::clone(self),
            user_id: user_id.to_string(),
            receiver: Some(receiver),
        }
    }

    pub async fn connection_count(&self, user_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(user_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Whether the hub still holds a channel for `user_id`.
    pub async fn is_tracking(&self, user_id: &str) -> bool {
        self.channels.read().await.contains_key(user_id)
    }

    /// Drops the user's channel once no receiver is left.
    pub async fn prune(&self, user_id: &str) {
        let mut channels = self.channels.write().await;
        if channels
            .get(user_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(user_id);
            tracing::debug!("Released notification channel of {}", user_id);
        }
    }

    /// Sends to the user's live connections only.
    pub async fn push(&self, notification: Notification) -> bool {
        let mut channels = self.channels.write().await;
        let user_id = notification.user_id.clone();

        let Some(sender) = channels.get(&user_id) else {
            tracing::debug!("No live connection for user {}, skipping {}", user_id, notification.kind);
            return false;
        };

        match sender.send(notification) {
            Ok(receivers) => {
                tracing::debug!("Notification delivered to {} connection(s) of {}", receivers, user_id);
                true
            }
            Err(_) => {
                // Every receiver is gone.
                channels.remove(&user_id);
                false
            }
        }
    }
}

/// A live connection to the hub.
pub struct Subscription {
    hub: Arc<NotificationHub>,
    user_id: String,
    receiver: Option<broadcast::Receiver<Notification>>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Result<Notification, RecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The receiver has to go before the prune checks the count.
        self.receiver.take();

        let hub = Arc::clone(&self.hub);
        let user_id = std::mem::take(&mut self.user_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { hub.prune(&user_id).await });
            }
            Err(_) => tracing::debug!("No runtime to release the channel of {}", user_id),
        }
    }
}

/// Stores every notification, then pushes it to live connections. A storage
/// failure is logged and the push still happens.
pub struct InboxNotifier {
    pool: SqlitePool,
    hub: Arc<NotificationHub>,
}

impl InboxNotifier {
    pub fn new(pool: SqlitePool, hub: Arc<NotificationHub>) -> Self {
        Self { pool, hub }
    }
}

#[async_trait]
impl Notifier for InboxNotifier {
    async fn notify(&self, notification: Notification) -> bool {
        if let Err(e) = NotificationRepository::new(&self.pool)
            .create_notification(&notification)
            .await
        {
            tracing::error!(
                "Failed to store notification {} for {}: {}",
                notification.id,
                notification.user_id,
                e
            );
        }
        self.hub.push(notification).await
    }
}

/// The caller's inbox.
pub struct NotificationService<'a> {
    state: &'a AppState,
}

impl<'a> NotificationService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> NotificationRepository<'_> {
        NotificationRepository::new(&self.state.pool)
    }

    /// Stores a message for another user and pushes it if they are online.
    ///
    /// # Errors
    /// - `ValidationError` for an empty recipient, title or message
    /// - `NotFound` if the recipient does not exist
    pub async fn send(
        &self,
        caller: &SessionUser,
        request: SendNotificationRequest,
    ) -> ServiceResult<Notification> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let recipient = UserRepository::new(&self.state.pool)
            .get_user_by_id(&request.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.user_id))?;

        let notification = Notification::new(
            recipient.id,
            request.kind.unwrap_or_else(|| "message".to_string()),
            request.title,
            request.message,
            request.data.unwrap_or_else(|| json!({})),
        )
        .triggered_by(caller.id());

        let stored = self.repo().create_notification(&notification).await?;
        self.state.notifications.push(stored.clone()).await;

        tracing::info!("User {} sent notification {} to {}", caller.id(), stored.id, stored.user_id);
        Ok(stored)
    }

    pub async fn list(&self, caller: &SessionUser) -> ServiceResult<Vec<Notification>> {
        Ok(self.repo().get_notifications_by_user(caller.id()).await?)
    }

    pub async fn unread(&self, caller: &SessionUser) -> ServiceResult<Vec<Notification>> {
        Ok(self.repo().get_unread_by_user(caller.id()).await?)
    }

    pub async fn unread_count(&self, caller: &SessionUser) -> ServiceResult<i64> {
        Ok(self.repo().count_unread(caller.id()).await?)
    }

    /// # Errors
    /// `NotFound` unless the notification belongs to the caller
    pub async fn mark_read(&self, caller: &SessionUser, id: &str) -> ServiceResult<Notification> {
        self.repo()
            .mark_read(id, caller.id())
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification", id))
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_read(&self, caller: &SessionUser) -> ServiceResult<u64> {
        let updated = self.repo().mark_all_read(caller.id()).await?;
        tracing::debug!("Marked {} notification(s) of {} read", updated, caller.id());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn note(user_id: &str, message: &str) -> Notification {
        Notification::new(user_id, "task_assigned", "Task", message, json!({}))
    }

    #[tokio::test]
    async fn delivers_only_to_the_addressed_user() {
        let hub = NotificationHub::new();
        let mut alice = hub.subscribe("alice").await;
        let mut bob = hub.subscribe("bob").await;

        assert!(hub.push(note("alice", "hello")).await);

        assert_eq!(alice.recv().await.unwrap().message, "hello");
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_users_are_skipped() {
        let hub = NotificationHub::new();
        assert!(!hub.push(note("nobody", "x")).await);

        let receiver = hub.subscribe("carol").await;
        assert_eq!(hub.connection_count("carol").await, 1);
        drop(receiver);
        assert!(!hub.push(note("carol", "x")).await);
        assert_eq!(hub.connection_count("carol").await, 0);
        assert!(!hub.is_tracking("carol").await);
    }

    #[tokio::test]
    async fn dropped_subscription_releases_its_channel() {
        let hub = Arc::new(NotificationHub::new());
        let mut subscription = hub.open("dave").await;

        assert!(hub.push(note("dave", "first")).await);
        assert_eq!(subscription.recv().await.unwrap().message, "first");
        drop(subscription);

        tokio::time::timeout(Duration::from_secs(1), async {
            while hub.is_tracking("dave").await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("channel should be released without a further push");
    }

    #[tokio::test]
    async fn prune_keeps_channels_with_live_receivers() {
        let hub = Arc::new(NotificationHub::new());
        let first = hub.open("erin").await;
        let mut second = hub.open("erin").await;

        drop(first);
        hub.prune("erin").await;

        assert!(hub.is_tracking("erin").await);
        assert!(hub.push(note("erin", "still here")).await);
        assert_eq!(second.recv().await.unwrap().message, "still here");
    }
}
