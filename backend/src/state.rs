//! Shared application state handed to every handler and guard.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::guard::{Authorizer, RolePermissionAuthorizer};
use crate::auth::revocation::{InMemoryRevocationStore, RevocationStore, SqlRevocationStore};
use crate::config::{Config, RevocationBackend};
use crate::errors::ServiceResult;
use crate::services::email_service::{EmailService, Mailer};
use crate::services::notification_service::{InboxNotifier, NotificationHub, Notifier};
use crate::utils::jwt::JwtUtils;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtUtils>,
    pub revocations: Arc<dyn RevocationStore>,
    pub authorizer: Arc<dyn Authorizer>,
    pub notifications: Arc<NotificationHub>,
    pub notifier: Arc<dyn Notifier>,
    pub mailer: Option<Arc<dyn Mailer>>,
}

impl AppState {
    /// Wires the default collaborators for `config`.
    pub fn new(pool: SqlitePool, config: Config) -> ServiceResult<Self> {
        let revocations: Arc<dyn RevocationStore> = match config.revocation_backend {
            RevocationBackend::Memory => Arc::new(InMemoryRevocationStore::new()),
            RevocationBackend::Database => Arc::new(SqlRevocationStore::new(pool.clone())),
        };

        let mailer: Option<Arc<dyn Mailer>> = match config.email_config() {
            Some(email_config) => Some(Arc::new(EmailService::new(email_config.clone())?)),
            None => {
                tracing::warn!("SMTP not configured, assignment emails are disabled");
                None
            }
        };

        let notifications = Arc::new(NotificationHub::new());
        let notifier: Arc<dyn Notifier> =
            Arc::new(InboxNotifier::new(pool.clone(), Arc::clone(&notifications)));

        Ok(Self {
            jwt: Arc::new(JwtUtils::from_config(&config)),
            pool,
            config: Arc::new(config),
            revocations,
            authorizer: Arc::new(RolePermissionAuthorizer),
            notifications,
            notifier,
            mailer,
        })
    }

    /// Replaces the revocation store.
    pub fn with_revocation_store(mut self, store: Arc<dyn RevocationStore>) -> Self {
        self.revocations = store;
        self
    }

    /// Replaces the capability check.
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Replaces how workflow notifications are delivered.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the outbound mailer.
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }
}
