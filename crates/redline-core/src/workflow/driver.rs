//! Run driver: starts or resumes runs and exports finished ones.

use std::path::PathBuf;

use redline_types::run::{IterationLimits, RunId, RunState};
use thiserror::Error;

use super::engine::{EngineError, RunOutcome, WorkflowEngine};
use super::export::{ArtifactWriter, ExportError, RunRecord};
use super::human::HumanChannel;
use crate::repository::CheckpointStore;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("run finished but export failed: {0}")]
    Export(#[from] ExportError),
}

/// Result of one driver call.
#[derive(Debug, Clone)]
pub struct DriverOutcome {
    pub outcome: RunOutcome,
    /// Artifacts written because the run completed during this call.
    pub artifacts: Vec<PathBuf>,
}

/// Owns an engine plus the artifact writer used when a run completes.
pub struct RunDriver<S: CheckpointStore, H: HumanChannel, W: ArtifactWriter> {
    engine: WorkflowEngine<S, H>,
    writer: W,
    limits: IterationLimits,
}

impl<S, H, W> RunDriver<S, H, W>
where
    S: CheckpointStore,
    H: HumanChannel,
    W: ArtifactWriter,
{
    pub fn new(engine: WorkflowEngine<S, H>, writer: W, limits: IterationLimits) -> Self {
        Self {
            engine,
            writer,
            limits,
        }
    }

    pub fn engine(&self) -> &WorkflowEngine<S, H> {
        &self.engine
    }

    /// Start a fresh run with a new id.
    pub async fn start(&self) -> Result<DriverOutcome, DriverError> {
        let run_id = RunId::new();
        let outcome = self.engine.run(run_id, RunState::new(self.limits)).await?;
        self.finish(outcome).await
    }

    pub async fn resume(&self, run_id: RunId) -> Result<DriverOutcome, DriverError> {
        let outcome = self.engine.resume(run_id).await?;
        self.finish(outcome).await
    }

    /// Export artifacts only when the run reached END during this call.
    async fn finish(&self, outcome: RunOutcome) -> Result<DriverOutcome, DriverError> {
        if !outcome.is_completed() || outcome.steps_executed == 0 {
            return Ok(DriverOutcome {
                outcome,
                artifacts: Vec::new(),
            });
        }
        let artifacts = export_run(self.engine.checkpoints().store(), &self.writer, outcome.run_id).await?;
        tracing::info!(
            run_id = %outcome.run_id,
            files = artifacts.len(),
            "exported run artifacts"
        );
        Ok(DriverOutcome {
            outcome,
            artifacts,
        })
    }
}

/// Load the latest checkpoint of a run and hand its record to `writer`.
pub async fn export_run<S: CheckpointStore, W: ArtifactWriter>(
    store: &S,
    writer: &W,
    run_id: RunId,
) -> Result<Vec<PathBuf>, DriverError> {
    let checkpoint = store.load(&run_id).await.map_err(EngineError::from)?;
    let record = RunRecord::from_checkpoint(&checkpoint);
    Ok(writer.write(&record).await?)
}
