//! Agent adapter abstractions.
//!
//! - `AgentAdapter`: RPITIT trait wrapping an external decision function
//! - `BoxAgentAdapter`: object-safe wrapper so the engine can hold all three roles
//! - `ScriptedAdapter`: replays queued outcomes, for tests and dry runs

pub mod box_adapter;
pub mod scripted;

use std::future::Future;
use std::sync::Arc;

use redline_types::agent::{AgentOutcome, AgentRole};
use redline_types::conversation::Turn;
use redline_types::error::AdapterError;

/// Ordered context handed to an agent.
///
/// `turns` is already filtered for the receiving role; adapters never see
/// turns the role is not supposed to read.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub role: AgentRole,
    pub turns: Vec<Turn>,
    /// Source material gathered by tools so far.
    pub collected_inputs: Vec<String>,
    /// Completed production rounds at the time of the call.
    pub round: u32,
}

/// Trait for agent backends (LLM-backed, scripted, etc.).
///
/// Implementations must be safe to call twice with the same context (the
/// engine retries once on failure) and must not hold on to run state: they
/// only return an outcome, the engine applies it.
pub trait AgentAdapter: Send + Sync {
    /// The role this adapter plays.
    fn role(&self) -> AgentRole;

    /// Produce one outcome for the given context.
    fn invoke(
        &self,
        context: &AgentContext,
    ) -> impl Future<Output = Result<AgentOutcome, AdapterError>> + Send;
}

impl<T: AgentAdapter> AgentAdapter for Arc<T> {
    fn role(&self) -> AgentRole {
        (**self).role()
    }

    fn invoke(
        &self,
        context: &AgentContext,
    ) -> impl Future<Output = Result<AgentOutcome, AdapterError>> + Send {
        (**self).invoke(context)
    }
}

/// Check that an outcome is one the role is allowed to return.
pub fn validate_outcome(role: AgentRole, outcome: &AgentOutcome) -> Result<(), AdapterError> {
    let allowed = match (role, outcome) {
        (AgentRole::Producer, AgentOutcome::Revision { .. }) => true,
        (AgentRole::Producer, AgentOutcome::ToolRequest { calls, .. }) => {
            if calls.is_empty() {
                return Err(AdapterError::Malformed(
                    "tool request without any calls".to_string(),
                ));
            }
            if let Some(call) = calls.iter().find(|c| c.name.is_empty() || c.call_id.is_empty()) {
                return Err(AdapterError::Malformed(format!(
                    "tool call is missing a name or call id: {call:?}"
                )));
            }
            true
        }
        (AgentRole::Reviewer | AgentRole::Verifier, AgentOutcome::Verdict { .. }) => true,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AdapterError::UnexpectedOutcome {
            role: role.to_string(),
            outcome: outcome.kind().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_types::conversation::ToolCall;

    #[test]
    fn test_producer_may_revise_or_request_tools() {
        let revision = AgentOutcome::Revision {
            text: "draft".into(),
            rationale: String::new(),
        };
        assert!(validate_outcome(AgentRole::Producer, &revision).is_ok());

        let request = AgentOutcome::ToolRequest {
            content: String::new(),
            calls: vec![ToolCall::new("fetch_article", "c1", Default::default())],
        };
        assert!(validate_outcome(AgentRole::Producer, &request).is_ok());
    }

    #[test]
    fn test_producer_verdict_is_rejected() {
        let verdict = AgentOutcome::Verdict {
            approved: true,
            feedback: "ok".into(),
        };
        let err = validate_outcome(AgentRole::Producer, &verdict).unwrap_err();
        assert!(matches!(err, AdapterError::UnexpectedOutcome { .. }));
    }

    #[test]
    fn test_reviewer_revision_is_rejected() {
        let revision = AgentOutcome::Revision {
            text: "draft".into(),
            rationale: String::new(),
        };
        assert!(validate_outcome(AgentRole::Reviewer, &revision).is_err());
        assert!(validate_outcome(AgentRole::Verifier, &revision).is_err());
    }

    #[test]
    fn test_empty_or_anonymous_tool_request_is_malformed() {
        let empty = AgentOutcome::ToolRequest {
            content: "let me check".into(),
            calls: vec![],
        };
        assert!(matches!(
            validate_outcome(AgentRole::Producer, &empty),
            Err(AdapterError::Malformed(_))
        ));

        let anonymous = AgentOutcome::ToolRequest {
            content: String::new(),
            calls: vec![ToolCall::new("fetch_article", "", Default::default())],
        };
        assert!(matches!(
            validate_outcome(AgentRole::Producer, &anonymous),
            Err(AdapterError::Malformed(_))
        ));
    }
}
