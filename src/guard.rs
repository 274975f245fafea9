use chrono::{DateTime, Utc};

use crate::models::Event;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Update,
    Delete,
}

impl Mutation {
    fn verb(self) -> &'static str {
        match self {
            Mutation::Update => "update",
            Mutation::Delete => "delete",
        }
    }
}

/// Checks, in order, that the event is live, has not ended and belongs to
/// `actor`, handing back the event on success.
///
/// The lifecycle check applies to deletes as well as updates.
pub fn authorize_mutation<'a>(
    event: Option<&'a Event>,
    event_id: i64,
    actor: i64,
    now: DateTime<Utc>,
    mutation: Mutation,
) -> Result<&'a Event, AppError> {
    let event = match event {
        Some(event) if !event.is_deleted() => event,
        _ => return Err(AppError::NotFound(format!("Event {event_id} not found"))),
    };

    if event.has_ended(now) {
        return Err(AppError::Expired(format!(
            "Cannot {} an event that has already ended",
            mutation.verb()
        )));
    }

    if event.organizer != actor {
        return Err(AppError::Forbidden(format!(
            "You are not authorized to {} this event",
            mutation.verb()
        )));
    }

    Ok(event)
}
