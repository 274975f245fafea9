use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::state::AppState;
use crate::utils::error::AppError;

/// Id of the user behind the request's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::AuthError("Unauthorized".into()))?;

        // The scheme is optional; clients of the original API send the bare token.
        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();

        let user_id = state.tokens.verify(token)?;
        Ok(Self(user_id))
    }
}
