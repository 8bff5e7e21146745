//! User repository.
//!
//! Point lookups and inserts on the `users` collection.

use super::user::{NewUser, User};
use super::DbPool;
use crate::id::EntityId;
use crate::{FilesError, Result};

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user and return it with its generated ID.
    ///
    /// A concurrent registration racing past the caller's uniqueness check
    /// is caught by the UNIQUE constraint and reported as a conflict.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id = EntityId::generate();

        sqlx::query("INSERT INTO users (id, email, password) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&new_user.email)
            .bind(&new_user.password)
            .execute(self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    FilesError::Conflict("Already exist".to_string())
                }
                other => FilesError::from(other),
            })?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| FilesError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &EntityId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, password FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by exact (case-sensitive) email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, email, password FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(self.pool)
                .await?;

        Ok(user)
    }

    /// Get the user whose stored email and password hash both match.
    pub async fn get_by_credentials(&self, email: &str, password_hash: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password FROM users WHERE email = ? AND password = ?",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = repo.create(&NewUser::new("a@x.com", "hash")).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.password, "hash");

        let fetched = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_get_by_email_is_case_sensitive() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("a@x.com", "hash")).await.unwrap();

        assert!(repo.get_by_email("a@x.com").await.unwrap().is_some());
        assert!(repo.get_by_email("A@X.COM").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_credentials() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("a@x.com", "hash")).await.unwrap();

        assert!(repo
            .get_by_credentials("a@x.com", "hash")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .get_by_credentials("a@x.com", "other")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("a@x.com", "h1")).await.unwrap();

        let result = repo.create(&NewUser::new("a@x.com", "h2")).await;
        assert!(matches!(result, Err(FilesError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_count() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.create(&NewUser::new("a@x.com", "h")).await.unwrap();
        repo.create(&NewUser::new("b@x.com", "h")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
