use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::utils::error::AppError;

/// Hashes `plaintext` into a PHC string on the blocking pool.
pub async fn hash_password(plaintext: &str) -> Result<String, AppError> {
    let plaintext = plaintext.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalServerError(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("hashing task failed: {e}")))?
}

/// `false` for a wrong password and for a malformed stored hash alike.
pub async fn verify_password(plaintext: &str, hash: &str) -> bool {
    let plaintext = plaintext.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed = match PasswordHash::new(&hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("hunter2").await.unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash).await);
        assert!(!verify_password("hunter3", &hash).await);
    }

    #[tokio::test]
    async fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("hunter2", "not-a-phc-string").await);
    }
}
