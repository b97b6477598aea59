//! Revoked session tokens.
//!
//! The store sits behind [`RevocationStore`] so a single instance can keep
//! the set in memory while a multi-instance deployment points every node at
//! the shared `revoked_tokens` table.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::errors::ServiceResult;

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Adds `token` to the set. Returns `true` if it was not already there.
    async fn revoke(&self, token: &str) -> ServiceResult<bool>;

    async fn is_revoked(&self, token: &str) -> ServiceResult<bool>;
}

/// Process-local revocation set. Cleared on restart.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    tokens: RwLock<HashSet<String>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token: &str) -> ServiceResult<bool> {
        Ok(self.tokens.write().await.insert(token.to_string()))
    }

    async fn is_revoked(&self, token: &str) -> ServiceResult<bool> {
        Ok(self.tokens.read().await.contains(token))
    }
}

/// Revocation set shared through the database.
pub struct SqlRevocationStore {
    pool: SqlitePool,
}

impl SqlRevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for SqlRevocationStore {
    async fn revoke(&self, token: &str) -> ServiceResult<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO revoked_tokens (token, revoked_at) VALUES (?, ?)")
                .bind(token)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(anyhow::Error::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_revoked(&self, token: &str) -> ServiceResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revoked_tokens WHERE token = ?")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoking_twice_is_a_no_op() {
        let store = InMemoryRevocationStore::new();

        assert!(!store.is_revoked("t1").await.unwrap());
        assert!(store.revoke("t1").await.unwrap());
        assert!(!store.revoke("t1").await.unwrap());
        assert!(store.is_revoked("t1").await.unwrap());
        assert!(!store.is_revoked("t2").await.unwrap());
        assert_eq!(store.len().await, 1);
    }
}
