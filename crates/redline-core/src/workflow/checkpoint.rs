//! Durable checkpoint manager for run state.
//!
//! Wraps a `CheckpointStore` to provide the two writes the engine makes:
//! seeding a new run and advancing an existing one past a node. Each write
//! carries the full state and the node to execute next, so a resumed run
//! never has to re-derive a routing decision.

use chrono::Utc;
use redline_types::error::StoreError;
use redline_types::run::{Checkpoint, RunId, RunState, RunStatus, RunSummary, Target};

use crate::repository::CheckpointStore;

/// Manages checkpoint writes for workflow runs.
///
/// Generic over `S: CheckpointStore` so it works with any storage backend
/// (SQLite, in-memory, etc.).
pub struct CheckpointManager<S: CheckpointStore> {
    store: S,
}

impl<S: CheckpointStore> CheckpointManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write the step-0 checkpoint of a new run.
    pub async fn seed(
        &self,
        run_id: RunId,
        state: RunState,
        entry: Target,
        status: RunStatus,
    ) -> Result<Checkpoint, StoreError> {
        let now = Utc::now();
        let checkpoint = Checkpoint {
            run_id,
            next: entry,
            status,
            step: 0,
            state,
            created_at: now,
            updated_at: now,
        };
        self.store.save(&checkpoint).await?;

        tracing::debug!(run_id = %run_id, next = %checkpoint.next, "seeded run checkpoint");
        Ok(checkpoint)
    }

    /// Persist the post-step state and the chosen next target.
    ///
    /// Returns the new checkpoint only once the store has accepted it.
    pub async fn advance(
        &self,
        previous: &Checkpoint,
        state: RunState,
        next: Target,
        status: RunStatus,
    ) -> Result<Checkpoint, StoreError> {
        let checkpoint = Checkpoint {
            run_id: previous.run_id,
            next,
            status,
            step: previous.step + 1,
            state,
            created_at: previous.created_at,
            updated_at: Utc::now(),
        };
        self.store.save(&checkpoint).await?;

        tracing::debug!(
            run_id = %checkpoint.run_id,
            step = checkpoint.step,
            next = %checkpoint.next,
            status = %checkpoint.status,
            "checkpointed step"
        );
        Ok(checkpoint)
    }

    pub async fn load(&self, run_id: &RunId) -> Result<Checkpoint, StoreError> {
        self.store.load(run_id).await
    }

    pub async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError> {
        self.store.exists(run_id).await
    }

    pub async fn list_runs(&self) -> Result<Vec<RunSummary>, StoreError> {
        self.store.list_runs().await
    }
}
