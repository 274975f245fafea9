use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::HashMap;

use crate::models::{Event, NewEvent};
use crate::repository::{is_busy, registrations};
use crate::utils::error::AppError;

const SELECT_LIVE_BY_ID: &str = "SELECT id, title, description, location, start_time, end_time, \
     organizer, created_at, updated_at, deleted_at, version \
     FROM events WHERE id = ? AND deleted_at IS NULL";

const SELECT_LIVE: &str = "SELECT id, title, description, location, start_time, end_time, \
     organizer, created_at, updated_at, deleted_at, version \
     FROM events WHERE deleted_at IS NULL ORDER BY id";

const SELECT_LIVE_ATTENDEES: &str = "SELECT a.event_id, a.user_id FROM event_attendees a \
     JOIN events e ON e.id = a.event_id \
     WHERE e.deleted_at IS NULL ORDER BY a.event_id, a.user_id";

/// Sole writer of the `events` table.
#[derive(Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a transaction that already holds the database write lock, so
    /// the reads that follow cannot be invalidated before the write.
    ///
    /// SQLite starts transactions deferred. Upgrading a read to a write while
    /// another connection is writing fails at once with `SQLITE_BUSY`, while
    /// a transaction whose first statement writes waits on the busy timeout.
    /// The no-op claim below makes that first statement a write.
    pub async fn begin_write(&self, id: i64) -> Result<Transaction<'static, Sqlite>, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE events SET version = version WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| contended(e, id))?;
        Ok(tx)
    }

    pub async fn create(
        &self,
        new_event: &NewEvent,
        organizer: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO events \
             (title, description, location, start_time, end_time, organizer, created_at, version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&new_event.title)
        .bind(&new_event.description)
        .bind(&new_event.location)
        .bind(new_event.start_time)
        .bind(new_event.end_time)
        .bind(organizer)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!(event_id = id, organizer, "Event inserted");
        Ok(id)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Event, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_live(&mut conn, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn list_active(&self) -> Result<Vec<Event>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut events: Vec<Event> = sqlx::query_as(SELECT_LIVE)
            .fetch_all(&mut *conn)
            .await?;

        let pairs: Vec<(i64, i64)> = sqlx::query_as(SELECT_LIVE_ATTENDEES)
            .fetch_all(&mut *conn)
            .await?;

        let mut by_event: HashMap<i64, Vec<i64>> = HashMap::new();
        for (event_id, user_id) in pairs {
            by_event.entry(event_id).or_default().push(user_id);
        }
        for event in &mut events {
            event.attendees = by_event.remove(&event.id).unwrap_or_default();
        }

        Ok(events)
    }

    /// Writes the mutable fields of `event` if it is still at `event.version`.
    /// Returns the stored event with its new version.
    pub async fn update(&self, event: &Event) -> Result<Event, AppError> {
        let mut conn = self.pool.acquire().await?;
        let version = write_update(&mut conn, event).await?;
        Ok(Event {
            version,
            ..event.clone()
        })
    }

    /// Marks the event deleted if it is still at `expected_version`.
    pub async fn soft_delete(
        &self,
        id: i64,
        when: DateTime<Utc>,
        expected_version: i64,
    ) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        write_soft_delete(&mut conn, id, expected_version, when).await
    }
}

/// Live event with hydrated attendees, or `None` if missing or soft-deleted.
pub async fn fetch_live(conn: &mut SqliteConnection, id: i64) -> Result<Option<Event>, AppError> {
    let event: Option<Event> = sqlx::query_as(SELECT_LIVE_BY_ID)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match event {
        Some(mut event) => {
            event.attendees = registrations::attendees(conn, id).await?;
            Ok(Some(event))
        }
        None => Ok(None),
    }
}

/// Compare-and-set on `version`. Organizer and attendees are never written.
pub async fn write_update(conn: &mut SqliteConnection, event: &Event) -> Result<i64, AppError> {
    let result = sqlx::query(
        "UPDATE events SET title = ?, description = ?, location = ?, start_time = ?, \
         end_time = ?, updated_at = ?, version = version + 1 \
         WHERE id = ? AND version = ? AND deleted_at IS NULL",
    )
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.location)
    .bind(event.start_time)
    .bind(event.end_time)
    .bind(event.updated_at)
    .bind(event.id)
    .bind(event.version)
    .execute(&mut *conn)
    .await
    .map_err(|e| contended(e, event.id))?;

    if result.rows_affected() == 0 {
        return Err(lost_write(conn, event.id).await);
    }
    Ok(event.version + 1)
}

pub async fn write_soft_delete(
    conn: &mut SqliteConnection,
    id: i64,
    expected_version: i64,
    when: DateTime<Utc>,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE events SET deleted_at = ?, version = version + 1 \
         WHERE id = ? AND version = ? AND deleted_at IS NULL",
    )
    .bind(when)
    .bind(id)
    .bind(expected_version)
    .execute(&mut *conn)
    .await
    .map_err(|e| contended(e, id))?;

    if result.rows_affected() == 0 {
        return Err(lost_write(conn, id).await);
    }
    Ok(())
}

/// Explains a compare-and-set that matched no row.
async fn lost_write(conn: &mut SqliteConnection, id: i64) -> AppError {
    let live: Result<Option<i64>, sqlx::Error> =
        sqlx::query_scalar("SELECT id FROM events WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await;

    match live {
        Ok(Some(_)) => {
            tracing::warn!(event_id = id, "Stale event version at write time");
            AppError::Conflict(format!("Event {id} was modified concurrently"))
        }
        Ok(None) => not_found(id),
        Err(e) => AppError::DatabaseError(e),
    }
}

/// A write that could not get the lock lost to a concurrent writer.
fn contended(err: sqlx::Error, id: i64) -> AppError {
    if is_busy(&err) {
        tracing::warn!(event_id = id, "Write lock contended");
        return AppError::Conflict(format!("Event {id} was modified concurrently"));
    }
    AppError::DatabaseError(err)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Event {id} not found"))
}
