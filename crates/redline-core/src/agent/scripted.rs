//! Scripted agent adapter.
//!
//! Replays a queue of prepared results in order and records every context it
//! was called with. Used by the engine tests and by `--dry-run` style wiring
//! where no model endpoint is available.

use std::collections::VecDeque;
use std::sync::Mutex;

use redline_types::agent::{AgentOutcome, AgentRole};
use redline_types::conversation::ToolCall;
use redline_types::error::AdapterError;

use super::{AgentAdapter, AgentContext};

/// Adapter that returns queued outcomes one per call.
///
/// When the queue is exhausted every further call fails with
/// `AdapterError::Transport`, which makes runaway loops visible in tests.
pub struct ScriptedAdapter {
    role: AgentRole,
    script: Mutex<VecDeque<Result<AgentOutcome, AdapterError>>>,
    seen: Mutex<Vec<AgentContext>>,
}

impl ScriptedAdapter {
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue an arbitrary result.
    pub fn then(self, result: Result<AgentOutcome, AdapterError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
        self
    }

    pub fn then_revision(self, text: impl Into<String>) -> Self {
        self.then(Ok(AgentOutcome::Revision {
            text: text.into(),
            rationale: String::new(),
        }))
    }

    pub fn then_tool_request(self, calls: Vec<ToolCall>) -> Self {
        self.then_tool_request_with_note(String::new(), calls)
    }

    pub fn then_tool_request_with_note(self, content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        self.then(Ok(AgentOutcome::ToolRequest {
            content: content.into(),
            calls,
        }))
    }

    pub fn then_verdict(self, approved: bool, feedback: impl Into<String>) -> Self {
        self.then(Ok(AgentOutcome::Verdict {
            approved,
            feedback: feedback.into(),
        }))
    }

    pub fn then_error(self, error: AdapterError) -> Self {
        self.then(Err(error))
    }

    /// Contexts received so far, in call order.
    pub fn seen(&self) -> Vec<AgentContext> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Outcomes still waiting to be served.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl AgentAdapter for ScriptedAdapter {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn invoke(&self, context: &AgentContext) -> Result<AgentOutcome, AdapterError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(context.clone());
        }
        let next = self
            .script
            .lock()
            .map_err(|_| AdapterError::Transport("script lock poisoned".to_string()))?
            .pop_front();
        next.unwrap_or_else(|| {
            Err(AdapterError::Transport(format!(
                "no scripted outcome left for {}",
                self.role
            )))
        })
    }
}
