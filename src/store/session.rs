//! Session stores.
//!
//! A session store maps string keys to string values with a time-to-live.
//! Two implementations are provided:
//!
//! - [`MemorySessionStore`]: a sharded in-process map. Sessions do not
//!   survive a restart.
//! - [`DatabaseSessionStore`]: rows in the `sessions` table with an
//!   absolute expiry.
//!
//! Expired entries are invisible to reads in both stores and are removed
//! by [`spawn_session_cleanup`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::db::Database;
use crate::Result;

/// Expiring key/value store used for login sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Get the live value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Returns `true` if a live value was removed.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Whether the store is reachable.
    async fn is_alive(&self) -> bool;

    /// Delete every expired entry. Returns the number removed.
    async fn purge_expired(&self) -> Result<u64>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory [`SessionStore`] backed by a [`DashMap`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    data: DashMap<String, Entry>,
}

impl MemorySessionStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.data.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.data.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove_if(key, |_, e| e.is_expired());
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }

        Ok(None)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        match self.data.remove(key) {
            Some((_, entry)) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn is_alive(&self) -> bool {
        true
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut removed = 0u64;
        self.data.retain(|_, entry| {
            let keep = !entry.is_expired();
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

/// [`SessionStore`] persisted in the metadata database.
#[derive(Debug, Clone)]
pub struct DatabaseSessionStore {
    db: Database,
}

impl DatabaseSessionStore {
    /// Create a store over the `sessions` table of `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DatabaseSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl_secs);

        sqlx::query(
            "INSERT INTO sessions (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM sessions WHERE key = ? AND expires_at > ?")
                .bind(key)
                .bind(Utc::now().timestamp())
                .fetch_optional(self.db.pool())
                .await?;

        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let expires_at: Option<i64> =
            sqlx::query_scalar("DELETE FROM sessions WHERE key = ? RETURNING expires_at")
                .bind(key)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(expires_at.is_some_and(|t| t > Utc::now().timestamp()))
    }

    async fn is_alive(&self) -> bool {
        self.db.is_alive().await
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }
}

/// Spawn the background task that purges expired sessions.
///
/// The first tick is skipped so nothing runs at startup.
pub fn spawn_session_cleanup(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;

        loop {
            interval.tick().await;

            match store.purge_expired().await {
                Ok(count) if count > 0 => {
                    tracing::info!(deleted_count = count, "Cleaned up expired sessions");
                }
                Ok(_) => {
                    tracing::debug!("No expired sessions to clean up");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to cleanup sessions");
                }
            }
        }
    })
}
