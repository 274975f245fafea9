use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod events;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "booking-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Folds axum's body rejections into the API error envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|e| {
        AppError::ValidationError(format!(
            "Invalid input could not be parsed: {}",
            e.body_text()
        ))
    })
}

fn event_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::ValidationError("Failed to parse event id".into()))
}
