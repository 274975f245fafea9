use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::User;
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO users (email, password, created_at) VALUES (?, ?, ?)")
            .bind(email)
            .bind(password_hash)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::ValidationError("email is already registered".into())
                }
                other => AppError::DatabaseError(other),
            })?;

        Ok(result.last_insert_rowid())
    }

    /// Live users only.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user: Option<User> = sqlx::query_as(
            "SELECT id, email, password, created_at, updated_at, deleted_at \
             FROM users WHERE email = ? AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
