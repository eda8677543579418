//! In-memory checkpoint store backed by `DashMap`.

use dashmap::DashMap;
use redline_types::error::StoreError;
use redline_types::run::{Checkpoint, RunId, RunSummary};

use super::CheckpointStore;

/// Process-local checkpoint store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: DashMap<RunId, Checkpoint>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.checkpoints.insert(checkpoint.run_id, checkpoint.clone());
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<Checkpoint, StoreError> {
        self.checkpoints
            .get(run_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::RunNotFound(*run_id))
    }

    async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError> {
        Ok(self.checkpoints.contains_key(run_id))
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>, StoreError> {
        let mut runs: Vec<RunSummary> = self
            .checkpoints
            .iter()
            .map(|entry| {
                let cp = entry.value();
                RunSummary {
                    run_id: cp.run_id,
                    next: cp.next.clone(),
                    status: cp.status,
                    step: cp.step,
                    updated_at: cp.updated_at,
                }
            })
            .collect();
        runs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(runs)
    }

    async fn delete(&self, run_id: &RunId) -> Result<bool, StoreError> {
        Ok(self.checkpoints.remove(run_id).is_some())
    }
}
