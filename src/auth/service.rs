//! Authentication service.
//!
//! Ties the user repository to the session manager: registration, login
//! with email and password, logout, and identity resolution for every
//! authenticated operation.

use tracing::warn;

use super::registration::{register, RegistrationRequest};
use super::session::SessionManager;
use super::hash_password;
use crate::db::{Database, UserRepository, UserSummary};
use crate::id::EntityId;
use crate::{FilesError, Result};

/// Account and session operations.
#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
    sessions: SessionManager,
}

impl AuthService {
    /// Create a new service.
    pub fn new(db: Database, sessions: SessionManager) -> Self {
        Self { db, sessions }
    }

    /// Session manager used by this service.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Register a new account. Returns its public view.
    pub async fn register(&self, request: RegistrationRequest) -> Result<UserSummary> {
        let repo = UserRepository::new(self.db.pool());
        register(&repo, request).await
    }

    /// Log in with an email and password. Returns a fresh session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        if email.is_empty() || password.is_empty() {
            return Err(FilesError::Unauthorized("Unauthorized".to_string()));
        }

        let repo = UserRepository::new(self.db.pool());
        let user = repo
            .get_by_credentials(email, &hash_password(password))
            .await?
            .ok_or_else(|| {
                warn!("Login failed: invalid credentials");
                FilesError::Unauthorized("Unauthorized".to_string())
            })?;

        self.sessions.create(&user.id).await
    }

    /// Revoke the session behind `token`.
    pub async fn logout(&self, token: Option<&str>) -> Result<()> {
        self.sessions.revoke(token).await?;
        Ok(())
    }

    /// The account behind `token`.
    pub async fn whoami(&self, token: Option<&str>) -> Result<UserSummary> {
        let user_id = self.resolve(token).await?;

        let repo = UserRepository::new(self.db.pool());
        let user = repo
            .get_by_id(&user_id)
            .await?
            .ok_or_else(|| FilesError::Unauthorized("Unauthorized".to_string()))?;

        Ok(user.summary())
    }

    /// Resolve `token` to a user ID.
    pub async fn resolve(&self, token: Option<&str>) -> Result<EntityId> {
        self.sessions.resolve(token).await
    }

    /// Count registered users.
    pub async fn count_users(&self) -> Result<i64> {
        UserRepository::new(self.db.pool()).count().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::store::MemorySessionStore;

    async fn service() -> AuthService {
        let db = Database::open_in_memory().await.unwrap();
        let sessions = SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(3600),
        );
        AuthService::new(db, sessions)
    }

    #[tokio::test]
    async fn test_register_login_whoami_logout() {
        let auth = service().await;

        let user = auth
            .register(RegistrationRequest::new("bob@dylan.com", "toto1234!"))
            .await
            .unwrap();

        let token = auth.login("bob@dylan.com", "toto1234!").await.unwrap();
        assert_eq!(auth.whoami(Some(&token)).await.unwrap(), user);

        auth.logout(Some(&token)).await.unwrap();
        assert!(matches!(
            auth.whoami(Some(&token)).await,
            Err(FilesError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.logout(Some(&token)).await,
            Err(FilesError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let auth = service().await;
        auth.register(RegistrationRequest::new("a@x.com", "pw"))
            .await
            .unwrap();

        for (email, password) in [("a@x.com", "wrong"), ("b@x.com", "pw"), ("", "pw"), ("a@x.com", "")] {
            let result = auth.login(email, password).await;
            assert!(
                matches!(result, Err(FilesError::Unauthorized(_))),
                "{email}:{password}"
            );
        }
    }

    #[tokio::test]
    async fn test_count_users() {
        let auth = service().await;
        assert_eq!(auth.count_users().await.unwrap(), 0);

        auth.register(RegistrationRequest::new("a@x.com", "pw"))
            .await
            .unwrap();
        assert_eq!(auth.count_users().await.unwrap(), 1);
    }
}
