use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Body of both `/signup` and `/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), AppError> {
        let email = self.email.trim();
        let well_formed = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.'),
            None => false,
        };
        if !well_formed {
            return Err(AppError::ValidationError("email is not valid".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::ValidationError("password is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_credentials_validation() {
        assert!(creds("ada@example.com", "secret").validate().is_ok());
        assert!(creds("ada.example.com", "secret").validate().is_err());
        assert!(creds("@example.com", "secret").validate().is_err());
        assert!(creds("ada@localhost", "secret").validate().is_err());
        assert!(creds("ada@example.com", "").validate().is_err());
    }
}
