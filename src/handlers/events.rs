use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::handlers::{event_id, json_body};
use crate::models::NewEvent;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

pub async fn list_events(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Response, AppError> {
    let events = state.events.list().await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    _user: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let event = state.events.get(event_id(path)?).await?;
    Ok(success(event, "Event retrieved").into_response())
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Result<Response, AppError> {
    let event = state.events.create(actor, json_body(payload)?).await?;
    Ok(created(event, "Event created successfully").into_response())
}

/// Partial update: any subset of the event's fields, keys matched loosely.
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = event_id(path)?;
    let outcome = state.events.update(actor, id, &json_body(payload)?).await?;
    Ok(success(outcome, "Event updated successfully").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    state.events.delete(actor, event_id(path)?).await?;
    Ok(empty_success("Event deleted successfully").into_response())
}

pub async fn register_for_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let id = event_id(path)?;
    state.events.register(actor, id).await?;
    Ok(created(
        serde_json::json!({ "event_id": id, "user_id": actor }),
        "Successfully registered for the event",
    )
    .into_response())
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    state.events.cancel(actor, event_id(path)?).await?;
    Ok(empty_success("Successfully cancelled registration for the event").into_response())
}
