use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    pub exp: i64,
}

/// Issues and checks HS256 bearer tokens.
///
/// Expiry is checked against the system clock by `jsonwebtoken`, so tokens are
/// always stamped with real time.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, AppError> {
        let claims = Claims {
            user_id,
            email: email.to_owned(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("token signing failed: {e}")))
    }

    /// Returns the user id carried by a valid token.
    pub fn verify(&self, token: &str) -> Result<i64, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token has expired",
                ErrorKind::InvalidAlgorithm => "unexpected signing method",
                ErrorKind::InvalidSignature => "token signature is invalid",
                _ => "could not parse token",
            };
            tracing::debug!(error = %e, "Token rejected");
            AppError::AuthError(reason.into())
        })?;
        Ok(data.claims.user_id)
    }
}
