//! Pure routing functions.
//!
//! Every router reads only the run state and returns a labelled outcome;
//! none of them mutate anything. The stage-exit predicates are shared with
//! the review/verify steps so the recorded exit reason always agrees with
//! the route actually taken.

use redline_types::run::{ExitReason, RunState};

use super::graph::Outcome;

/// Whether a gated stage lets the run move on.
///
/// Approval wins over the ceiling; the ceiling is reached once `round`
/// is at or above `ceiling`.
pub fn stage_exit(approved: bool, round: u32, ceiling: u32) -> Option<ExitReason> {
    if approved {
        Some(ExitReason::Approved)
    } else if round >= ceiling {
        Some(ExitReason::Ceiling)
    } else {
        None
    }
}

pub fn review_exit(state: &RunState) -> Option<ExitReason> {
    stage_exit(state.reviewer_ok, state.round, state.limits.max_review_rounds)
}

pub fn verify_exit(state: &RunState) -> Option<ExitReason> {
    stage_exit(state.verifier_ok, state.round, state.limits.max_verify_rounds)
}

// ---------------------------------------------------------------------------
// Human gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanRoute {
    Continue,
    Finish,
}

impl Outcome for HumanRoute {
    const ALL: &'static [Self] = &[HumanRoute::Continue, HumanRoute::Finish];

    fn label(self) -> &'static str {
        match self {
            HumanRoute::Continue => "continue",
            HumanRoute::Finish => "finish",
        }
    }
}

pub fn route_after_human(state: &RunState) -> HumanRoute {
    if state.human_done {
        HumanRoute::Finish
    } else {
        HumanRoute::Continue
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProduceRoute {
    InvokeTools,
    Review,
    /// Review already approved this instruction; go straight to verification.
    SkipReview,
}

impl Outcome for ProduceRoute {
    const ALL: &'static [Self] = &[
        ProduceRoute::InvokeTools,
        ProduceRoute::Review,
        ProduceRoute::SkipReview,
    ];

    fn label(self) -> &'static str {
        match self {
            ProduceRoute::InvokeTools => "tools",
            ProduceRoute::Review => "review",
            ProduceRoute::SkipReview => "approved",
        }
    }
}

pub fn route_after_produce(state: &RunState) -> ProduceRoute {
    if !state.pending_tool_calls().is_empty() {
        ProduceRoute::InvokeTools
    } else if state.reviewer_ok {
        ProduceRoute::SkipReview
    } else {
        ProduceRoute::Review
    }
}

// ---------------------------------------------------------------------------
// Reviewer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewRoute {
    Approved,
    CeilingReached,
    Rejected,
}

impl Outcome for ReviewRoute {
    const ALL: &'static [Self] = &[
        ReviewRoute::Approved,
        ReviewRoute::CeilingReached,
        ReviewRoute::Rejected,
    ];

    fn label(self) -> &'static str {
        match self {
            ReviewRoute::Approved => "approved",
            ReviewRoute::CeilingReached => "ceiling",
            ReviewRoute::Rejected => "rejected",
        }
    }
}

pub fn route_after_review(state: &RunState) -> ReviewRoute {
    match review_exit(state) {
        Some(ExitReason::Approved) => ReviewRoute::Approved,
        Some(ExitReason::Ceiling) => ReviewRoute::CeilingReached,
        None => ReviewRoute::Rejected,
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyRoute {
    Verified,
    CeilingReached,
    Rejected,
}

impl Outcome for VerifyRoute {
    const ALL: &'static [Self] = &[
        VerifyRoute::Verified,
        VerifyRoute::CeilingReached,
        VerifyRoute::Rejected,
    ];

    fn label(self) -> &'static str {
        match self {
            VerifyRoute::Verified => "verified",
            VerifyRoute::CeilingReached => "ceiling",
            VerifyRoute::Rejected => "rejected",
        }
    }
}

pub fn route_after_verify(state: &RunState) -> VerifyRoute {
    match verify_exit(state) {
        Some(ExitReason::Approved) => VerifyRoute::Verified,
        Some(ExitReason::Ceiling) => VerifyRoute::CeilingReached,
        None => VerifyRoute::Rejected,
    }
}
