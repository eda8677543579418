//! Retry handling for agent calls.
//!
//! Agent calls are re-run immediately with the identical context; there is
//! no backoff and no prompt rewriting. An outcome the role may not return
//! counts as a failed attempt, the same as a transport error.

use redline_types::agent::AgentOutcome;
use redline_types::error::AdapterError;

use crate::agent::box_adapter::BoxAgentAdapter;
use crate::agent::{AgentContext, validate_outcome};

/// How many times one agent call may be attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` is 1-based (first execution is attempt 1).
    pub fn should_retry(&self, attempt: u32, _error: &AdapterError) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// One call plus one immediate retry.
    fn default() -> Self {
        Self::new(2)
    }
}

/// The last error after the attempt budget ran out.
#[derive(Debug, Clone)]
pub struct AdapterFailure {
    pub attempts: u32,
    pub error: AdapterError,
}

/// Invoke `adapter`, validating and retrying per `policy`.
pub async fn invoke_with_retry(
    adapter: &BoxAgentAdapter,
    context: &AgentContext,
    policy: &RetryPolicy,
) -> Result<AgentOutcome, AdapterFailure> {
    let role = adapter.role();
    let mut attempt = 1;
    loop {
        let result = adapter
            .invoke(context)
            .await
            .and_then(|outcome| validate_outcome(role, &outcome).map(|()| outcome));

        match result {
            Ok(outcome) => return Ok(outcome),
            Err(error) if policy.should_retry(attempt, &error) => {
                tracing::warn!(
                    role = %role,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    error = %error,
                    "agent call failed, retrying"
                );
                attempt += 1;
            }
            Err(error) => {
                return Err(AdapterFailure {
                    attempts: attempt,
                    error,
                });
            }
        }
    }
}
