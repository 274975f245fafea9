use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::clock::Clock;
use crate::guard::{authorize_mutation, Mutation};
use crate::models::{Event, NewEvent};
use crate::patch::{apply_patch, MismatchPolicy, PatchOutcome};
use crate::repository::events::{fetch_live, write_soft_delete, write_update};
use crate::repository::{EventRepository, RegistrationLedger};
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct EventService {
    repo: EventRepository,
    ledger: RegistrationLedger,
    clock: Arc<dyn Clock>,
    policy: MismatchPolicy,
}

impl EventService {
    pub fn new(repo: EventRepository, ledger: RegistrationLedger, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            ledger,
            clock,
            policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[tracing::instrument(skip(self, new_event), fields(title = %new_event.title))]
    pub async fn create(&self, actor: i64, new_event: NewEvent) -> Result<Event, AppError> {
        new_event.validate()?;
        let id = self.repo.create(&new_event, actor, self.clock.now()).await?;
        info!(event_id = id, "Event created");
        self.repo.get_by_id(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Event, AppError> {
        self.repo.get_by_id(id).await
    }

    pub async fn list(&self) -> Result<Vec<Event>, AppError> {
        self.repo.list_active().await
    }

    /// Guard, merge and compare-and-set write inside one write-locked
    /// transaction. Concurrent updates queue on the lock; a write that still
    /// finds a stale version fails with `Conflict` and leaves the stored event
    /// as the winner wrote it.
    #[tracing::instrument(skip(self, payload))]
    pub async fn update(
        &self,
        actor: i64,
        id: i64,
        payload: &Value,
    ) -> Result<PatchOutcome, AppError> {
        let now = self.clock.now();
        let mut tx = self.repo.begin_write(id).await?;

        let current = fetch_live(&mut tx, id).await?;
        let current = authorize_mutation(current.as_ref(), id, actor, now, Mutation::Update)?;

        let mut outcome = apply_patch(current, payload, now, self.policy)?;
        outcome.event.version = write_update(&mut tx, &outcome.event).await?;
        tx.commit().await?;

        info!(
            applied = ?outcome.applied,
            rejected = outcome.rejected.len(),
            ignored = outcome.ignored.len(),
            "Event updated"
        );
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, actor: i64, id: i64) -> Result<(), AppError> {
        let now = self.clock.now();
        let mut tx = self.repo.begin_write(id).await?;

        let current = fetch_live(&mut tx, id).await?;
        let current = authorize_mutation(current.as_ref(), id, actor, now, Mutation::Delete)?;

        write_soft_delete(&mut tx, id, current.version, now).await?;
        tx.commit().await?;

        info!("Event deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn register(&self, actor: i64, id: i64) -> Result<(), AppError> {
        self.ledger.register(id, actor).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, actor: i64, id: i64) -> Result<(), AppError> {
        self.ledger.cancel(id, actor).await
    }
}
