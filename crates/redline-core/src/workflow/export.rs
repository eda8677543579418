//! Run record export.
//!
//! A `RunRecord` is the self-contained, serializable summary of a run that
//! gets handed to an `ArtifactWriter`. Where and how it is written (files,
//! object storage, nowhere) is up to the writer.

use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use redline_types::conversation::{Role, ToolCall, Turn};
use redline_types::run::{Checkpoint, IterationLimits, RunId, RunStatus, StageExit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("artifact I/O error: {0}")]
    Io(String),

    #[error("artifact serialization error: {0}")]
    Serialize(String),
}

/// One conversation turn as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedTurn {
    pub role: Role,
    /// Originating agent, absent for human and tool turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl From<&Turn> for ExportedTurn {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            agent: turn.role.agent_tag().map(str::to_string),
            content: turn.content.clone(),
            tool_calls: turn.tool_calls.clone(),
            call_id: turn.call_id.clone(),
            is_error: turn.is_error,
        }
    }
}

/// Full record of a run, as written to `pipeline_result.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub status: RunStatus,
    pub exported_at: DateTime<Utc>,
    pub rounds: u32,
    pub limits: IterationLimits,
    /// Last element of `drafts`, if any round completed.
    pub final_draft: Option<String>,
    pub drafts: Vec<String>,
    pub collected_inputs: Vec<String>,
    pub stage_exits: Vec<StageExit>,
    pub conversation: Vec<ExportedTurn>,
}

impl RunRecord {
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        let state = &checkpoint.state;
        Self {
            run_id: checkpoint.run_id,
            status: checkpoint.status,
            exported_at: Utc::now(),
            rounds: state.round,
            limits: state.limits,
            final_draft: state.latest_draft().map(str::to_string),
            drafts: state.drafts.clone(),
            collected_inputs: state.collected_inputs.clone(),
            stage_exits: state.stage_exits.clone(),
            conversation: state.conversation.iter().map(ExportedTurn::from).collect(),
        }
    }
}

/// Destination for run records.
pub trait ArtifactWriter: Send + Sync {
    /// Write the record, returning the paths of everything written.
    fn write(
        &self,
        record: &RunRecord,
    ) -> impl Future<Output = Result<Vec<PathBuf>, ExportError>> + Send;
}

/// Discards records. For tests and library use without artifacts.
impl ArtifactWriter for () {
    async fn write(&self, _record: &RunRecord) -> Result<Vec<PathBuf>, ExportError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_types::run::RunState;

    fn checkpoint() -> Checkpoint {
        let mut state = RunState::default();
        state.conversation = vec![
            Turn::human("task"),
            Turn::producer("v1"),
            Turn::tool_error("c1", "timeout"),
        ];
        state.drafts = vec!["v1".into()];
        state.round = 1;
        let now = Utc::now();
        Checkpoint {
            run_id: RunId::new(),
            next: redline_types::run::Target::End,
            status: RunStatus::Completed,
            step: 6,
            state,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_record_carries_final_draft_and_agent_tags() {
        let record = RunRecord::from_checkpoint(&checkpoint());
        assert_eq!(record.final_draft.as_deref(), Some("v1"));
        assert_eq!(record.rounds, 1);
        assert_eq!(record.conversation[0].agent, None);
        assert_eq!(record.conversation[1].agent.as_deref(), Some("producer"));
        assert!(record.conversation[2].is_error);
    }

    #[test]
    fn test_record_json_shape() {
        let record = RunRecord::from_checkpoint(&checkpoint());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["conversation"][1]["agent"], "producer");
        assert!(json["conversation"][0].get("agent").is_none());
        assert!(json["conversation"][0].get("is_error").is_none());
        assert_eq!(json["conversation"][2]["call_id"], "c1");
    }
}
