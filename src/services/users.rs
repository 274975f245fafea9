use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::auth::{hash_password, verify_password, TokenService};
use crate::clock::Clock;
use crate::models::Credentials;
use crate::repository::UserRepository;
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
    tokens: Arc<TokenService>,
    clock: Arc<dyn Clock>,
    /// Verified against when the email is unknown, so both login failures
    /// cost one argon2 run.
    dummy_hash: Arc<OnceCell<String>>,
}

impl UserService {
    pub fn new(repo: UserRepository, tokens: Arc<TokenService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            tokens,
            clock,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    #[tracing::instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn signup(&self, credentials: &Credentials) -> Result<i64, AppError> {
        credentials.validate()?;
        let hash = hash_password(&credentials.password).await?;
        let id = self
            .repo
            .create(credentials.email.trim(), &hash, self.clock.now())
            .await?;
        tracing::info!(user_id = id, "User signed up");
        Ok(id)
    }

    /// Returns a bearer token. Unknown email and wrong password fail alike.
    #[tracing::instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<String, AppError> {
        let invalid = || AppError::AuthError("Invalid email or password".into());

        let Some(user) = self.repo.find_by_email(credentials.email.trim()).await? else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| hash_password("booking-login-dummy"))
                .await?;
            verify_password(&credentials.password, dummy).await;
            return Err(invalid());
        };

        if !verify_password(&credentials.password, &user.password).await {
            return Err(invalid());
        }

        self.tokens.issue(user.id, &user.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::repository::test_support::pool;
    use chrono::Duration;

    async fn service() -> (UserService, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::new("test-secret", Duration::hours(2)));
        let service = UserService::new(
            UserRepository::new(pool().await),
            tokens.clone(),
            Arc::new(SystemClock),
        );
        (service, tokens)
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (service, tokens) = service().await;
        let id = service
            .signup(&creds("ada@example.com", "hunter2"))
            .await
            .unwrap();

        let token = service
            .login(&creds("ada@example.com", "hunter2"))
            .await
            .unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), id);
    }

    #[tokio::test]
    async fn test_login_failures_are_auth_errors() {
        let (service, _) = service().await;
        service
            .signup(&creds("ada@example.com", "hunter2"))
            .await
            .unwrap();

        assert!(matches!(
            service.login(&creds("ada@example.com", "wrong")).await,
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            service.login(&creds("bob@example.com", "hunter2")).await,
            Err(AppError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_email_still_runs_a_password_check() {
        let (service, _) = service().await;
        assert!(service.dummy_hash.get().is_none());

        assert!(matches!(
            service.login(&creds("ghost@example.com", "hunter2")).await,
            Err(AppError::AuthError(_))
        ));
        let dummy = service.dummy_hash.get().unwrap();
        assert!(dummy.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_signup_rejects_bad_input() {
        let (service, _) = service().await;
        assert!(matches!(
            service.signup(&creds("nope", "hunter2")).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
