use sqlx::{SqliteConnection, SqlitePool};

use crate::utils::error::AppError;

/// Join-table bookkeeping for `(event, user)` attendance pairs.
#[derive(Clone)]
pub struct RegistrationLedger {
    pool: SqlitePool,
}

impl RegistrationLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Adds `user_id` to a live event. A second registration for the same
    /// pair fails with `DuplicateRegistration` and writes nothing.
    ///
    /// The insert runs first so the transaction takes the write lock before
    /// reading; concurrent registrations queue on the lock instead of failing
    /// their upgrade with `SQLITE_BUSY`.
    pub async fn register(&self, event_id: i64, user_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO event_attendees (event_id, user_id) \
             SELECT id, ? FROM events WHERE id = ? AND deleted_at IS NULL \
             ON CONFLICT (event_id, user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound(format!("User {user_id} not found"))
            }
            other => AppError::DatabaseError(other),
        })?;

        if result.rows_affected() == 0 {
            let live: Option<i64> =
                sqlx::query_scalar("SELECT id FROM events WHERE id = ? AND deleted_at IS NULL")
                    .bind(event_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match live {
                Some(_) => AppError::DuplicateRegistration { event_id, user_id },
                None => AppError::NotFound(format!("Event {event_id} not found")),
            });
        }

        tx.commit().await?;
        tracing::info!(event_id, user_id, "Registered attendee");
        Ok(())
    }

    /// Removes the pair if present. Missing pairs are not an error.
    pub async fn cancel(&self, event_id: i64, user_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM event_attendees WHERE event_id = ? AND user_id = ?")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            event_id,
            user_id,
            removed = result.rows_affected(),
            "Cancelled registration"
        );
        Ok(())
    }

    pub async fn attendees(&self, event_id: i64) -> Result<Vec<i64>, AppError> {
        let mut conn = self.pool.acquire().await?;
        attendees(&mut conn, event_id).await
    }
}

/// Attendee ids of one event, ascending.
pub async fn attendees(conn: &mut SqliteConnection, event_id: i64) -> Result<Vec<i64>, AppError> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT user_id FROM event_attendees WHERE event_id = ? ORDER BY user_id",
    )
    .bind(event_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}
