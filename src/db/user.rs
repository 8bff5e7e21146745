//! User model.

use serde::Serialize;

use crate::id::EntityId;

/// A registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: EntityId,
    /// Login email (unique, case-sensitive).
    pub email: String,
    /// SHA-1 hex digest of the password.
    pub password: String,
}

impl User {
    /// Public view of the account, without the password hash.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone(),
        }
    }
}

/// What callers get to see of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// User ID.
    pub id: EntityId,
    /// Email address.
    pub email: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Password hash (already hashed).
    pub password: String,
}

impl NewUser {
    /// Create a new user record from an email and a password hash.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password_hash.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_omits_hash() {
        let user = User {
            id: EntityId::parse("u1").unwrap(),
            email: "a@x.com".to_string(),
            password: "deadbeef".to_string(),
        };

        let json = serde_json::to_value(user.summary()).unwrap();
        assert_eq!(json, serde_json::json!({"id": "u1", "email": "a@x.com"}));
    }
}
