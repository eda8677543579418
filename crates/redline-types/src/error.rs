use thiserror::Error;

use crate::run::RunId;

/// Errors from agent adapters.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The underlying call failed (network, rate limit, provider outage).
    #[error("agent call failed: {0}")]
    Transport(String),

    /// The underlying output could not be turned into an outcome.
    #[error("malformed agent output: {0}")]
    Malformed(String),

    /// The adapter produced an outcome its role may not return.
    #[error("unexpected {outcome} outcome from {role}")]
    UnexpectedOutcome { role: String, outcome: String },
}

/// Errors from tool execution. Never fatal to a run.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// Errors from checkpoint store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("corrupt checkpoint for run {run_id}: {reason}")]
    Corrupt { run_id: RunId, reason: String },
}
