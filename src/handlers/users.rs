use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::handlers::json_body;
use crate::models::Credentials;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Serialize)]
struct SignupPayload {
    id: i64,
    email: String,
}

#[derive(Serialize)]
struct TokenPayload {
    token: String,
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AppError> {
    let credentials = json_body(payload)?;
    let id = state.users.signup(&credentials).await?;
    let body = SignupPayload {
        id,
        email: credentials.email.trim().to_string(),
    };
    Ok(created(body, "User created successfully").into_response())
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AppError> {
    let token = state.users.login(&json_body(payload)?).await?;
    Ok(success(TokenPayload { token }, "User logged in successfully").into_response())
}
