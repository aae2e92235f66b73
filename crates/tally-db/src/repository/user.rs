//! # User Repository
//!
//! The engine does not manage users; it only needs rows for the acting-user
//! foreign keys and a summary to attach to sale reads.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::UserSummary;

/// Repository for acting users.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a user.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn insert(&self, name: &str, email: &str) -> DbResult<UserSummary> {
        let user = UserSummary {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, is_active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<UserSummary>> {
        Self::find_summary(&self.pool, id).await
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<UserSummary> {
        sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", email))
    }

    pub async fn find_summary<'e, E>(executor: E, id: &str) -> DbResult<Option<UserSummary>>
    where
        E: SqliteExecutor<'e>,
    {
        let user = sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().insert("Ana", "ana@example.com").await.unwrap();

        let found = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(db.users().get_by_email("ana@example.com").await.unwrap().id, user.id);
        assert!(db.users().get_by_id("missing").await.unwrap().is_none());

        let dup = db.users().insert("Other", "ana@example.com").await.unwrap_err();
        assert!(matches!(dup, DbError::UniqueViolation { .. }));
    }
}
