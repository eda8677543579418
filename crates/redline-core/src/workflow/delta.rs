//! State deltas returned by workflow steps.
//!
//! Steps never touch `RunState` directly. They return a `StateDelta` and the
//! engine applies it, which keeps every mutation append-only and lets a
//! failed checkpoint write discard the change wholesale.

use redline_types::conversation::Turn;
use redline_types::run::{RunState, StageExit};

/// The changes one step makes to the run state.
///
/// Constructors encode the allowed shapes: a draft can only be added
/// together with the round increment, and a new human instruction always
/// clears both approval flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    turns: Vec<Turn>,
    draft: Option<String>,
    collected_inputs: Vec<String>,
    reviewer_ok: Option<bool>,
    verifier_ok: Option<bool>,
    human_done: bool,
    stage_exit: Option<StageExit>,
}

impl StateDelta {
    /// A step that changes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn human_instruction(text: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::human(text)],
            reviewer_ok: Some(false),
            verifier_ok: Some(false),
            ..Self::default()
        }
    }

    pub fn human_finished() -> Self {
        Self {
            human_done: true,
            ..Self::default()
        }
    }

    /// A completed production round: the turn plus the draft it carries.
    pub fn revision(turn: Turn, draft: impl Into<String>) -> Self {
        Self {
            turns: vec![turn],
            draft: Some(draft.into()),
            ..Self::default()
        }
    }

    pub fn tool_request(turn: Turn) -> Self {
        Self {
            turns: vec![turn],
            ..Self::default()
        }
    }

    pub fn tool_results(turns: Vec<Turn>, collected_inputs: Vec<String>) -> Self {
        Self {
            turns,
            collected_inputs,
            ..Self::default()
        }
    }

    pub fn review(feedback: impl Into<String>, approved: bool, exit: Option<StageExit>) -> Self {
        Self {
            turns: vec![Turn::reviewer(feedback)],
            reviewer_ok: Some(approved),
            stage_exit: exit,
            ..Self::default()
        }
    }

    pub fn verification(
        feedback: impl Into<String>,
        approved: bool,
        exit: Option<StageExit>,
    ) -> Self {
        Self {
            turns: vec![Turn::verifier(feedback)],
            verifier_ok: Some(approved),
            stage_exit: exit,
            ..Self::default()
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn completes_round(&self) -> bool {
        self.draft.is_some()
    }

    /// Fold this delta into `state`.
    pub fn apply(self, state: &mut RunState) {
        state.conversation.extend(self.turns);
        if let Some(draft) = self.draft {
            state.drafts.push(draft);
            state.round += 1;
        }
        state.collected_inputs.extend(self.collected_inputs);
        if let Some(ok) = self.reviewer_ok {
            state.reviewer_ok = ok;
        }
        if let Some(ok) = self.verifier_ok {
            state.verifier_ok = ok;
        }
        if self.human_done {
            state.human_done = true;
        }
        if let Some(exit) = self.stage_exit {
            state.stage_exits.push(exit);
        }
    }
}
