//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! database URLs, server port, session signing keys, cookie policy and the
//! optional SMTP relay used for outbound notifications.

use anyhow::{Context, Result, bail};
use std::env;

/// Where revoked session tokens are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationBackend {
    /// Process-local set, lost on restart.
    Memory,
    /// Shared `revoked_tokens` table, visible to every instance on the same database.
    Database,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expires_in_seconds: u64,
    pub server_port: u16,
    /// `true` when `APP_ENV=production`; session cookies become `Secure; SameSite=None`.
    pub production: bool,
    pub bcrypt_cost: u32,
    pub revocation_backend: RevocationBackend,
    /// Refuse site-incharge reviews until the contractor has submitted.
    pub review_requires_contractor_submission: bool,
    pub email: Option<EmailConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// SMTP relay settings. Only present when `SMTP_HOST` is set.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    pub base_url: String,
}

/// Administrator account created on startup if no user owns `email` yet.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        let jwt_expires_in_seconds = env::var("JWT_EXPIRES_IN_SECONDS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<u64>()
            .context("JWT_EXPIRES_IN_SECONDS must be a valid number")?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let production = env::var("APP_ENV")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
            .parse::<u32>()
            .context("BCRYPT_COST must be a valid number")?;

        let revocation_backend = match env::var("REVOCATION_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => RevocationBackend::Memory,
            "database" => RevocationBackend::Database,
            other => bail!("REVOCATION_BACKEND must be 'memory' or 'database', got '{}'", other),
        };

        let review_requires_contractor_submission = env::var("REVIEW_REQUIRES_CONTRACTOR_SUBMISSION")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .context("REVIEW_REQUIRES_CONTRACTOR_SUBMISSION must be true or false")?;

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            jwt_expires_in_seconds,
            server_port,
            production,
            bcrypt_cost,
            revocation_backend,
            review_requires_contractor_submission,
            email: Self::email_from_env()?,
            bootstrap_admin: Self::bootstrap_admin_from_env(),
        })
    }

    /// Returns the SMTP settings, if outbound email is configured.
    pub fn email_config(&self) -> Option<&EmailConfig> {
        self.email.as_ref()
    }

    fn email_from_env() -> Result<Option<EmailConfig>> {
        let Ok(smtp_host) = env::var("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .context("SMTP_PORT must be a valid number")?;

        Ok(Some(EmailConfig {
            smtp_host,
            smtp_port,
            smtp_username: env::var("SMTP_USERNAME").context("SMTP_USERNAME not set")?,
            smtp_password: env::var("SMTP_PASSWORD").context("SMTP_PASSWORD not set")?,
            from_email: env::var("SMTP_FROM_EMAIL").context("SMTP_FROM_EMAIL not set")?,
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Estateflow".to_string()),
            base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }))
    }

    fn bootstrap_admin_from_env() -> Option<BootstrapAdmin> {
        let email = env::var("ADMIN_EMAIL").ok()?;
        let password = env::var("ADMIN_PASSWORD").ok()?;
        let name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

        Some(BootstrapAdmin {
            name,
            email,
            password,
        })
    }
}
