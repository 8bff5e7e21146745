//! User registration.

use serde::Deserialize;
use tracing::info;

use super::hash_password;
use crate::db::{NewUser, UserRepository, UserSummary};
use crate::{FilesError, Result};

/// Registration request data.
///
/// Fields are optional so that a missing one is reported by name rather
/// than as a malformed body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    /// Login email.
    pub email: Option<String>,
    /// Plaintext password.
    pub password: Option<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }
}

/// Register a new user.
///
/// 1. Rejects a missing email, then a missing password
/// 2. Rejects an email that is already registered (exact match)
/// 3. Stores the email with the password hash
pub async fn register(repo: &UserRepository<'_>, request: RegistrationRequest) -> Result<UserSummary> {
    let email = request
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| FilesError::BadRequest("Missing email".to_string()))?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| FilesError::BadRequest("Missing password".to_string()))?;

    if repo.get_by_email(&email).await?.is_some() {
        return Err(FilesError::Conflict("Already exist".to_string()));
    }

    let user = repo
        .create(&NewUser::new(email, hash_password(&password)))
        .await?;

    info!(user_id = %user.id, "User registered");
    Ok(user.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_register_success() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = register(&repo, RegistrationRequest::new("bob@dylan.com", "toto1234!"))
            .await
            .unwrap();
        assert_eq!(user.email, "bob@dylan.com");

        let stored = repo.get_by_email("bob@dylan.com").await.unwrap().unwrap();
        assert_eq!(stored.password, "89cad29e3ebc1035b29b1478a8e70854f25fa2b2");
    }

    #[tokio::test]
    async fn test_register_missing_fields() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let result = register(&repo, RegistrationRequest::default()).await;
        assert!(matches!(result, Err(FilesError::BadRequest(m)) if m == "Missing email"));

        let request = RegistrationRequest {
            email: Some("a@x.com".to_string()),
            password: None,
        };
        let result = register(&repo, request).await;
        assert!(matches!(result, Err(FilesError::BadRequest(m)) if m == "Missing password"));

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        register(&repo, RegistrationRequest::new("a@x.com", "one"))
            .await
            .unwrap();
        let result = register(&repo, RegistrationRequest::new("a@x.com", "two")).await;

        assert!(matches!(result, Err(FilesError::Conflict(m)) if m == "Already exist"));
    }
}
