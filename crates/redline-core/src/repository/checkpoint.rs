//! Checkpoint store trait definition.

use std::future::Future;
use std::sync::Arc;

use redline_types::error::StoreError;
use redline_types::run::{Checkpoint, RunId, RunSummary};

/// Durable storage for run checkpoints, keyed by run id.
///
/// `save` replaces any previous checkpoint for the same run and must be
/// atomic: after a crash either the old or the new checkpoint is visible,
/// never a mix.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait CheckpointStore: Send + Sync {
    /// Insert or replace the checkpoint for `checkpoint.run_id`.
    fn save(&self, checkpoint: &Checkpoint) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load the latest checkpoint, or `StoreError::RunNotFound`.
    fn load(&self, run_id: &RunId) -> impl Future<Output = Result<Checkpoint, StoreError>> + Send;

    fn exists(&self, run_id: &RunId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All known runs, most recently updated first.
    fn list_runs(&self) -> impl Future<Output = Result<Vec<RunSummary>, StoreError>> + Send;

    /// Remove a run. Returns `true` if it existed.
    fn delete(&self, run_id: &RunId) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<T: CheckpointStore> CheckpointStore for Arc<T> {
    fn save(&self, checkpoint: &Checkpoint) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).save(checkpoint)
    }

    fn load(&self, run_id: &RunId) -> impl Future<Output = Result<Checkpoint, StoreError>> + Send {
        (**self).load(run_id)
    }

    fn exists(&self, run_id: &RunId) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).exists(run_id)
    }

    fn list_runs(&self) -> impl Future<Output = Result<Vec<RunSummary>, StoreError>> + Send {
        (**self).list_runs()
    }

    fn delete(&self, run_id: &RunId) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).delete(run_id)
    }
}
