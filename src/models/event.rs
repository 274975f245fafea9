use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub organizer: i64,
    /// Hydrated from `event_attendees`, never stored on the row.
    #[sqlx(skip)]
    pub attendees: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Bumped on every write; used for compare-and-set.
    pub version: i64,
}

impl Event {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time < now
    }
}

/// Payload for creating an event. The organizer comes from the session.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::ValidationError("title must not be empty".into()));
        }
        validate_window(self.start_time, self.end_time)
    }
}

pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::ValidationError(
            "end_time must not precede start_time".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_event_rejects_blank_title() {
        let new_event = NewEvent {
            title: "   ".into(),
            description: None,
            location: None,
            start_time: ts("2025-01-01T09:00:00Z"),
            end_time: ts("2025-01-01T09:30:00Z"),
        };
        assert!(matches!(
            new_event.validate(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_new_event_rejects_inverted_window() {
        let new_event = NewEvent {
            title: "Standup".into(),
            description: None,
            location: None,
            start_time: ts("2025-01-01T09:30:00Z"),
            end_time: ts("2025-01-01T09:00:00Z"),
        };
        assert!(new_event.validate().is_err());
    }

    #[test]
    fn test_new_event_accepts_zero_length_window() {
        let new_event = NewEvent {
            title: "Standup".into(),
            description: None,
            location: None,
            start_time: ts("2025-01-01T09:00:00Z"),
            end_time: ts("2025-01-01T09:00:00Z"),
        };
        assert!(new_event.validate().is_ok());
    }

    #[test]
    fn test_deserialize_new_event_without_optionals() {
        let json = r#"{
            "title": "Standup",
            "start_time": "2025-01-01T09:00:00Z",
            "end_time": "2025-01-01T09:30:00Z"
        }"#;
        let new_event: NewEvent = serde_json::from_str(json).unwrap();
        assert_eq!(new_event.title, "Standup");
        assert!(new_event.description.is_none());
    }
}
