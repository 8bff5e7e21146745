//! Login sessions.
//!
//! A session is a random token mapped to a user ID in the session store
//! under the key `auth_<token>`. Tokens are opaque to clients and expire
//! after the configured TTL. A user may hold any number of tokens at once.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::id::EntityId;
use crate::store::SessionStore;
use crate::{FilesError, Result};

/// Default session duration in seconds (24 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 86_400;

/// Prefix of session keys in the store.
const KEY_PREFIX: &str = "auth_";

fn session_key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

fn unauthorized() -> FilesError {
    FilesError::Unauthorized("Unauthorized".to_string())
}

/// Issues, resolves and revokes session tokens.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a manager over `store` with the given session lifetime.
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the backing store is reachable.
    pub async fn is_alive(&self) -> bool {
        self.store.is_alive().await
    }

    /// Mint a new token for `user_id`.
    pub async fn create(&self, user_id: &EntityId) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.store
            .set(&session_key(&token), user_id.as_str(), self.ttl)
            .await?;

        info!(user_id = %user_id, "Session created");
        Ok(token)
    }

    /// Resolve a token to the user ID it was issued for.
    ///
    /// Fails with `Unauthorized` if the token is absent, unknown or expired.
    pub async fn resolve(&self, token: Option<&str>) -> Result<EntityId> {
        let token = token.filter(|t| !t.is_empty()).ok_or_else(unauthorized)?;

        let user_id = self
            .store
            .get(&session_key(token))
            .await?
            .ok_or_else(|| {
                debug!("Session lookup: token not found");
                unauthorized()
            })?;

        EntityId::parse(&user_id).ok_or_else(unauthorized)
    }

    /// Revoke a token.
    ///
    /// Fails with `Unauthorized` if the token is absent, unknown or
    /// already revoked.
    pub async fn revoke(&self, token: Option<&str>) -> Result<EntityId> {
        let user_id = self.resolve(token).await?;
        let token = token.unwrap_or_default();

        if !self.store.del(&session_key(token)).await? {
            return Err(unauthorized());
        }

        info!(user_id = %user_id, "Session revoked");
        Ok(user_id)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;

    fn manager() -> (Arc<MemorySessionStore>, SessionManager) {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(
            store.clone(),
            Duration::from_secs(DEFAULT_SESSION_DURATION_SECS),
        );
        (store, manager)
    }

    #[tokio::test]
    async fn test_create_and_resolve() {
        let (store, manager) = manager();
        let user_id = EntityId::generate();

        let token = manager.create(&user_id).await.unwrap();
        assert_eq!(manager.resolve(Some(&token)).await.unwrap(), user_id);

        let raw = store.get(&format!("auth_{token}")).await.unwrap();
        assert_eq!(raw.as_deref(), Some(user_id.as_str()));
    }

    #[tokio::test]
    async fn test_resolve_missing_or_unknown() {
        let (_store, manager) = manager();

        for token in [None, Some(""), Some("nope")] {
            let result = manager.resolve(token).await;
            assert!(matches!(result, Err(FilesError::Unauthorized(_))));
        }
    }

    #[tokio::test]
    async fn test_multiple_tokens_per_user() {
        let (_store, manager) = manager();
        let user_id = EntityId::generate();

        let a = manager.create(&user_id).await.unwrap();
        let b = manager.create(&user_id).await.unwrap();
        assert_ne!(a, b);

        manager.revoke(Some(&a)).await.unwrap();
        assert!(manager.resolve(Some(&a)).await.is_err());
        assert_eq!(manager.resolve(Some(&b)).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_revoke_twice() {
        let (_store, manager) = manager();
        let token = manager.create(&EntityId::generate()).await.unwrap();

        manager.revoke(Some(&token)).await.unwrap();
        let result = manager.revoke(Some(&token)).await;
        assert!(matches!(result, Err(FilesError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_expired_session() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store, Duration::ZERO);

        let token = manager.create(&EntityId::generate()).await.unwrap();
        assert!(manager.resolve(Some(&token)).await.is_err());
    }
}
