//! Step runner for the five node kinds.
//!
//! `StepRunner` dispatches on `NodeKind`, reads the current run state, calls
//! the matching port (agent adapter, tool registry, or human channel), and
//! returns a `StateDelta`. It never writes state or checkpoints itself.

use redline_types::agent::{AgentOutcome, AgentRole};
use redline_types::conversation::Turn;
use redline_types::error::AdapterError;
use redline_types::run::{RunState, Stage, StageExit};
use thiserror::Error;

use super::context::build_context;
use super::delta::StateDelta;
use super::graph::NodeKind;
use super::human::{HumanChannel, HumanError, HumanPrompt, HumanReply, TerminationWords};
use super::retry::{RetryPolicy, invoke_with_retry};
use super::router;
use crate::agent::box_adapter::BoxAgentAdapter;
use crate::tool::ToolRegistry;

// ---------------------------------------------------------------------------
// StepResult / StepError
// ---------------------------------------------------------------------------

/// What a step asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// Apply the delta, route, checkpoint, and continue.
    Advance(StateDelta),
    /// Stop here without writing; the run stays at this node.
    Suspend,
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("{role} failed after {attempts} attempt(s): {source}")]
    Adapter {
        role: AgentRole,
        attempts: u32,
        #[source]
        source: AdapterError,
    },

    #[error(transparent)]
    Human(#[from] HumanError),
}

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

/// The three agent adapters a run needs.
pub struct Agents {
    pub producer: BoxAgentAdapter,
    pub reviewer: BoxAgentAdapter,
    pub verifier: BoxAgentAdapter,
}

impl Agents {
    fn for_role(&self, role: AgentRole) -> &BoxAgentAdapter {
        match role {
            AgentRole::Producer => &self.producer,
            AgentRole::Reviewer => &self.reviewer,
            AgentRole::Verifier => &self.verifier,
        }
    }
}

/// Executes individual nodes against the ports.
pub struct StepRunner<H: HumanChannel> {
    agents: Agents,
    tools: ToolRegistry,
    human: H,
    termination: TerminationWords,
    retry: RetryPolicy,
}

impl<H: HumanChannel> StepRunner<H> {
    pub fn new(agents: Agents, tools: ToolRegistry, human: H) -> Self {
        Self {
            agents,
            tools,
            human,
            termination: TerminationWords::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_termination_words(mut self, words: TerminationWords) -> Self {
        self.termination = words;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn human(&self) -> &H {
        &self.human
    }

    /// Execute one node against a read-only view of the state.
    pub async fn run(&self, kind: NodeKind, state: &RunState) -> Result<StepResult, StepError> {
        match kind {
            NodeKind::AwaitHuman => self.await_human(state).await,
            NodeKind::Produce => self.produce(state).await.map(StepResult::Advance),
            NodeKind::InvokeTools => Ok(StepResult::Advance(self.invoke_tools(state).await)),
            NodeKind::Review => self.review(state).await.map(StepResult::Advance),
            NodeKind::Verify => self.verify(state).await.map(StepResult::Advance),
        }
    }

    async fn call_agent(
        &self,
        role: AgentRole,
        state: &RunState,
    ) -> Result<AgentOutcome, StepError> {
        let context = build_context(role, state);
        invoke_with_retry(self.agents.for_role(role), &context, &self.retry)
            .await
            .map_err(|failure| StepError::Adapter {
                role,
                attempts: failure.attempts,
                source: failure.error,
            })
    }

    async fn await_human(&self, state: &RunState) -> Result<StepResult, StepError> {
        let prompt = HumanPrompt {
            latest_draft: state.latest_draft().map(str::to_string),
            round: state.round,
        };
        match self.human.ask(&prompt).await? {
            HumanReply::Interrupted => {
                tracing::info!(round = state.round, "human gate interrupted, suspending run");
                Ok(StepResult::Suspend)
            }
            HumanReply::Message(text) if self.termination.matches(&text) => {
                tracing::info!(round = state.round, "human ended the run");
                Ok(StepResult::Advance(StateDelta::human_finished()))
            }
            HumanReply::Message(text) => {
                tracing::debug!(chars = text.len(), "received human instruction");
                Ok(StepResult::Advance(StateDelta::human_instruction(text)))
            }
        }
    }

    async fn produce(&self, state: &RunState) -> Result<StateDelta, StepError> {
        match self.call_agent(AgentRole::Producer, state).await? {
            AgentOutcome::ToolRequest { content, calls } => {
                tracing::info!(
                    round = state.round,
                    tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "producer requested tools"
                );
                Ok(StateDelta::tool_request(Turn::producer_tool_request(content, calls)))
            }
            AgentOutcome::Revision { text, rationale } => {
                tracing::info!(
                    round = state.round + 1,
                    chars = text.len(),
                    "producer completed revision"
                );
                let content = if rationale.trim().is_empty() {
                    text.clone()
                } else {
                    format!("REASONING:\n{rationale}\n\nSCRIPT:\n{text}")
                };
                Ok(StateDelta::revision(Turn::producer(content), text))
            }
            // Ruled out by validate_outcome inside invoke_with_retry.
            other @ AgentOutcome::Verdict { .. } => Err(StepError::Adapter {
                role: AgentRole::Producer,
                attempts: self.retry.max_attempts(),
                source: AdapterError::UnexpectedOutcome {
                    role: AgentRole::Producer.to_string(),
                    outcome: other.kind().to_string(),
                },
            }),
        }
    }

    async fn invoke_tools(&self, state: &RunState) -> StateDelta {
        let calls = state.pending_tool_calls();
        if calls.is_empty() {
            tracing::warn!("tool node reached without pending tool calls");
            return StateDelta::empty();
        }

        let mut turns = Vec::with_capacity(calls.len());
        let mut inputs = Vec::new();
        for invocation in self.tools.dispatch(calls).await {
            match invocation.result {
                Ok(output) => {
                    turns.push(Turn::tool_result(&invocation.call_id, output.clone()));
                    inputs.push(output);
                }
                Err(e) => turns.push(Turn::tool_error(&invocation.call_id, e.to_string())),
            }
        }
        StateDelta::tool_results(turns, inputs)
    }

    async fn review(&self, state: &RunState) -> Result<StateDelta, StepError> {
        let (approved, feedback) = self.verdict(AgentRole::Reviewer, state).await?;
        let exit = router::stage_exit(approved, state.round, state.limits.max_review_rounds)
            .map(|reason| StageExit {
                stage: Stage::Review,
                round: state.round,
                reason,
            });
        log_verdict(AgentRole::Reviewer, state.round, approved, exit);
        Ok(StateDelta::review(feedback, approved, exit))
    }

    async fn verify(&self, state: &RunState) -> Result<StateDelta, StepError> {
        let (approved, feedback) = self.verdict(AgentRole::Verifier, state).await?;
        let exit = router::stage_exit(approved, state.round, state.limits.max_verify_rounds)
            .map(|reason| StageExit {
                stage: Stage::Verify,
                round: state.round,
                reason,
            });
        log_verdict(AgentRole::Verifier, state.round, approved, exit);
        Ok(StateDelta::verification(feedback, approved, exit))
    }

    async fn verdict(&self, role: AgentRole, state: &RunState) -> Result<(bool, String), StepError> {
        match self.call_agent(role, state).await? {
            AgentOutcome::Verdict { approved, feedback } => Ok((approved, feedback)),
            // Ruled out by validate_outcome inside invoke_with_retry.
            other => Err(StepError::Adapter {
                role,
                attempts: self.retry.max_attempts(),
                source: AdapterError::UnexpectedOutcome {
                    role: role.to_string(),
                    outcome: other.kind().to_string(),
                },
            }),
        }
    }
}

fn log_verdict(role: AgentRole, round: u32, approved: bool, exit: Option<StageExit>) {
    match exit {
        Some(exit) if !approved => tracing::warn!(
            role = %role,
            round,
            reason = ?exit.reason,
            "iteration ceiling reached, passing draft on without approval"
        ),
        _ => tracing::info!(role = %role, round, approved, "verdict received"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::scripted::ScriptedAdapter;
    use crate::tool::Tool;
    use crate::workflow::human::QueuedHuman;
    use redline_types::conversation::{Role, ToolCall};
    use redline_types::error::ToolError;
    use redline_types::run::ExitReason;
    use serde_json::{Map, Value, json};

    struct Lookup;

    impl Tool for Lookup {
        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Look up a fact"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
            match arguments.get("q").and_then(Value::as_str) {
                Some(q) => Ok(format!("fact about {q}")),
                None => Err(ToolError::InvalidArguments("missing 'q'".into())),
            }
        }
    }

    fn runner(
        producer: ScriptedAdapter,
        reviewer: ScriptedAdapter,
        human: QueuedHuman,
    ) -> StepRunner<QueuedHuman> {
        StepRunner::new(
            Agents {
                producer: BoxAgentAdapter::new(producer),
                reviewer: BoxAgentAdapter::new(reviewer),
                verifier: BoxAgentAdapter::new(ScriptedAdapter::new(AgentRole::Verifier)),
            },
            ToolRegistry::new().with(Lookup),
            human,
        )
    }

    #[tokio::test]
    async fn test_human_reply_variants() {
        let runner = runner(
            ScriptedAdapter::new(AgentRole::Producer),
            ScriptedAdapter::new(AgentRole::Reviewer),
            QueuedHuman::new(["write it", "DONE"]),
        );
        let state = RunState::default();

        let first = runner.run(NodeKind::AwaitHuman, &state).await.unwrap();
        assert_eq!(first, StepResult::Advance(StateDelta::human_instruction("write it")));

        let second = runner.run(NodeKind::AwaitHuman, &state).await.unwrap();
        assert_eq!(second, StepResult::Advance(StateDelta::human_finished()));

        let third = runner.run(NodeKind::AwaitHuman, &state).await.unwrap();
        assert_eq!(third, StepResult::Suspend);
    }

    #[tokio::test]
    async fn test_revision_keeps_reasoning_in_turn_only() {
        let runner = runner(
            ScriptedAdapter::new(AgentRole::Producer).then(Ok(AgentOutcome::Revision {
                text: "the script".into(),
                rationale: "tightened the hook".into(),
            })),
            ScriptedAdapter::new(AgentRole::Reviewer),
            QueuedHuman::default(),
        );
        let mut state = RunState::default();
        match runner.run(NodeKind::Produce, &state).await.unwrap() {
            StepResult::Advance(delta) => {
                assert!(delta.completes_round());
                assert!(delta.turns()[0].content.starts_with("REASONING:"));
                delta.apply(&mut state);
            }
            StepResult::Suspend => panic!("produce never suspends"),
        }
        assert_eq!(state.latest_draft(), Some("the script"));
        assert_eq!(state.round, 1);
    }

    #[tokio::test]
    async fn test_tool_results_are_correlated_and_collected() {
        let runner = runner(
            ScriptedAdapter::new(AgentRole::Producer),
            ScriptedAdapter::new(AgentRole::Reviewer),
            QueuedHuman::default(),
        );
        let mut state = RunState::default();
        let mut args = Map::new();
        args.insert("q".into(), json!("tides"));
        state.conversation.push(Turn::producer_tool_request(
            "",
            vec![
                ToolCall::new("lookup", "c1", args),
                ToolCall::new("lookup", "c2", Map::new()),
            ],
        ));

        let StepResult::Advance(delta) = runner.run(NodeKind::InvokeTools, &state).await.unwrap()
        else {
            panic!("tools never suspend");
        };
        delta.apply(&mut state);

        let results: Vec<_> = state.conversation[1..].iter().collect();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|t| t.role == Role::ToolResult));
        assert_eq!(results[0].call_id.as_deref(), Some("c1"));
        assert!(!results[0].is_error);
        assert_eq!(results[1].call_id.as_deref(), Some("c2"));
        assert!(results[1].is_error);
        assert_eq!(state.collected_inputs, vec!["fact about tides"]);
        assert_eq!(state.round, 0);
    }

    #[tokio::test]
    async fn test_review_at_ceiling_records_exit() {
        let runner = runner(
            ScriptedAdapter::new(AgentRole::Producer),
            ScriptedAdapter::new(AgentRole::Reviewer).then_verdict(false, "still flat"),
            QueuedHuman::default(),
        );
        let mut state = RunState::default();
        state.round = state.limits.max_review_rounds;

        let StepResult::Advance(delta) = runner.run(NodeKind::Review, &state).await.unwrap() else {
            panic!("review never suspends");
        };
        delta.apply(&mut state);
        assert!(!state.reviewer_ok);
        assert_eq!(state.stage_exits.len(), 1);
        assert_eq!(state.stage_exits[0].reason, ExitReason::Ceiling);
        assert_eq!(state.stage_exits[0].stage, Stage::Review);
    }

    #[tokio::test]
    async fn test_adapter_failure_surfaces_attempts() {
        let runner = runner(
            ScriptedAdapter::new(AgentRole::Producer)
                .then_error(AdapterError::Transport("down".into()))
                .then_error(AdapterError::Transport("still down".into())),
            ScriptedAdapter::new(AgentRole::Reviewer),
            QueuedHuman::default(),
        );
        let err = runner
            .run(NodeKind::Produce, &RunState::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StepError::Adapter {
                role: AgentRole::Producer,
                attempts: 2,
                ..
            }
        ));
    }
}
