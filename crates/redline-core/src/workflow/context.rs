//! Per-role conversation views.
//!
//! The producer sees the whole conversation. The reviewer judges style and
//! never sees verifier turns; the verifier judges facts against the drafts
//! and sources only, so human and reviewer turns are hidden from it.

use redline_types::agent::AgentRole;
use redline_types::conversation::{Role, Turn};
use redline_types::run::RunState;

use crate::agent::AgentContext;

/// Whether `viewer` may see `turn`.
pub fn visible_to(viewer: AgentRole, turn: &Turn) -> bool {
    match viewer {
        AgentRole::Producer => true,
        AgentRole::Reviewer => turn.role != Role::Verifier,
        AgentRole::Verifier => !matches!(turn.role, Role::Human | Role::Reviewer),
    }
}

/// Build the filtered, ordered context for one agent call.
pub fn build_context(viewer: AgentRole, state: &RunState) -> AgentContext {
    AgentContext {
        role: viewer,
        turns: state
            .conversation
            .iter()
            .filter(|turn| visible_to(viewer, turn))
            .cloned()
            .collect(),
        collected_inputs: state.collected_inputs.clone(),
        round: state.round,
    }
}
