use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::clock::Clock;
use crate::patch::MismatchPolicy;
use crate::repository::{EventRepository, RegistrationLedger, UserRepository};
use crate::services::{EventService, UserService};

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub users: UserService,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, tokens: TokenService, clock: Arc<dyn Clock>) -> Self {
        let tokens = Arc::new(tokens);
        let events = EventService::new(
            EventRepository::new(pool.clone()),
            RegistrationLedger::new(pool.clone()),
            clock.clone(),
        );
        let users = UserService::new(UserRepository::new(pool), tokens.clone(), clock);

        Self {
            events,
            users,
            tokens,
        }
    }

    pub fn with_patch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.events = self.events.with_policy(policy);
        self
    }
}
