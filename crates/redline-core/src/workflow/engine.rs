//! Workflow engine: executes a compiled graph with durable checkpoints.
//!
//! Per node the engine
//! 1. runs the step against the current state (read-only),
//! 2. applies the returned delta to a copy of the state,
//! 3. asks the graph for the next target using the new state,
//! 4. checkpoints state and next target, and only then moves on.
//!
//! A failed step or a failed checkpoint write leaves the last checkpoint as
//! the run's only truth, so `resume` re-executes the node that did not
//! complete. An interrupted human gate returns without writing anything.

use redline_types::agent::AgentRole;
use redline_types::error::{AdapterError, StoreError};
use redline_types::run::{Checkpoint, RunId, RunState, RunStatus, Target};
use thiserror::Error;
use tracing::{Instrument, info, info_span};

use super::checkpoint::CheckpointManager;
use super::graph::{CompiledGraph, GraphError};
use super::human::{HumanChannel, HumanError};
use super::steps::{StepError, StepResult, StepRunner};
use crate::repository::CheckpointStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error("run already exists: {0}")]
    RunExists(RunId),

    #[error("step '{node}' failed after {attempts} attempt(s) ({role}): {source}")]
    StepFailed {
        node: String,
        role: AgentRole,
        attempts: u32,
        #[source]
        source: AdapterError,
    },

    #[error("checkpoint write failed: {0}")]
    Persistence(#[source] StoreError),

    #[error("human channel failed: {0}")]
    Human(#[from] HumanError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RunNotFound(id) => EngineError::RunNotFound(id),
            other => EngineError::Persistence(other),
        }
    }
}

impl EngineError {
    fn from_step(node: &str, err: StepError) -> Self {
        match err {
            StepError::Adapter {
                role,
                attempts,
                source,
            } => EngineError::StepFailed {
                node: node.to_string(),
                role,
                attempts,
                source,
            },
            StepError::Human(e) => EngineError::Human(e),
        }
    }
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

/// Where a `run`/`resume` call left the run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// `Completed` at END, `AwaitingHuman` when suspended at the gate.
    pub status: RunStatus,
    pub next: Target,
    /// Checkpoint step number of the last durable write.
    pub step: u64,
    pub state: RunState,
    /// Nodes completed during this call.
    pub steps_executed: u64,
}

impl RunOutcome {
    fn from_checkpoint(checkpoint: Checkpoint, steps_executed: u64) -> Self {
        Self {
            run_id: checkpoint.run_id,
            status: checkpoint.status,
            next: checkpoint.next,
            step: checkpoint.step,
            state: checkpoint.state,
            steps_executed,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Drives runs through a compiled graph.
///
/// Single-threaded per run: nodes execute strictly one after another.
/// Separate runs may share a store as long as their ids differ.
pub struct WorkflowEngine<S: CheckpointStore, H: HumanChannel> {
    graph: CompiledGraph,
    checkpoints: CheckpointManager<S>,
    runner: StepRunner<H>,
}

impl<S: CheckpointStore, H: HumanChannel> WorkflowEngine<S, H> {
    pub fn new(graph: CompiledGraph, store: S, runner: StepRunner<H>) -> Self {
        Self {
            graph,
            checkpoints: CheckpointManager::new(store),
            runner,
        }
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub fn checkpoints(&self) -> &CheckpointManager<S> {
        &self.checkpoints
    }

    /// Start a new run at the graph's entry node.
    pub async fn run(&self, run_id: RunId, initial: RunState) -> Result<RunOutcome, EngineError> {
        if self.checkpoints.exists(&run_id).await? {
            return Err(EngineError::RunExists(run_id));
        }
        let entry = self.graph.entry();
        let status = self.graph.status_for(&entry);
        let checkpoint = self.checkpoints.seed(run_id, initial, entry, status).await?;
        info!(run_id = %run_id, "started run");

        let span = info_span!("run", run_id = %run_id);
        self.drive(checkpoint).instrument(span).await
    }

    /// Continue a run from its latest checkpoint.
    pub async fn resume(&self, run_id: RunId) -> Result<RunOutcome, EngineError> {
        let checkpoint = self.checkpoints.load(&run_id).await?;
        info!(
            run_id = %run_id,
            step = checkpoint.step,
            next = %checkpoint.next,
            "resuming run"
        );

        let span = info_span!("run", run_id = %run_id);
        self.drive(checkpoint).instrument(span).await
    }

    async fn drive(&self, mut checkpoint: Checkpoint) -> Result<RunOutcome, EngineError> {
        let mut executed = 0u64;
        loop {
            let node = match &checkpoint.next {
                Target::End => {
                    info!(
                        step = checkpoint.step,
                        rounds = checkpoint.state.round,
                        "run completed"
                    );
                    return Ok(RunOutcome::from_checkpoint(checkpoint, executed));
                }
                Target::Node(name) => name.clone(),
            };
            let kind = self
                .graph
                .kind(&node)
                .ok_or_else(|| GraphError::UnknownNode(node.clone()))?;

            tracing::debug!(node = %node, step = checkpoint.step, "executing node");
            let delta = match self
                .runner
                .run(kind, &checkpoint.state)
                .await
                .map_err(|e| EngineError::from_step(&node, e))?
            {
                StepResult::Advance(delta) => delta,
                StepResult::Suspend => {
                    return Ok(RunOutcome::from_checkpoint(checkpoint, executed));
                }
            };

            let mut state = checkpoint.state.clone();
            delta.apply(&mut state);
            let next = self.graph.next(&node, &state)?;
            let status = self.graph.status_for(&next);
            checkpoint = self
                .checkpoints
                .advance(&checkpoint, state, next, status)
                .await?;
            executed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::agent::box_adapter::BoxAgentAdapter;
    use crate::agent::{AgentAdapter, AgentContext};
    use crate::agent::scripted::ScriptedAdapter;
    use crate::repository::InMemoryCheckpointStore;
    use crate::tool::{Tool, ToolRegistry};
    use crate::workflow::graph::{self, revision_pipeline};
    use crate::workflow::human::{HumanPrompt, HumanReply, QueuedHuman};
    use crate::workflow::steps::Agents;
    use redline_types::agent::AgentOutcome;
    use redline_types::conversation::{Role, ToolCall};
    use redline_types::error::ToolError;
    use redline_types::run::{ExitReason, IterationLimits, RunSummary, Stage};
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
            json!({"type": "object", "properties": {"q": {"type": "string"}}})
        }

        async fn call(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
            let q = crate::tool::required_str(arguments, "q")?;
            Ok(format!("fact about {q}"))
        }
    }

    struct Script {
        producer: Arc<ScriptedAdapter>,
        reviewer: Arc<ScriptedAdapter>,
        verifier: Arc<ScriptedAdapter>,
    }

    impl Script {
        fn new(producer: ScriptedAdapter, reviewer: ScriptedAdapter, verifier: ScriptedAdapter) -> Self {
            Self {
                producer: Arc::new(producer),
                reviewer: Arc::new(reviewer),
                verifier: Arc::new(verifier),
            }
        }

        fn idle() -> Self {
            Self::new(
                ScriptedAdapter::new(AgentRole::Producer),
                ScriptedAdapter::new(AgentRole::Reviewer),
                ScriptedAdapter::new(AgentRole::Verifier),
            )
        }

        fn agents(&self) -> Agents {
            Agents {
                producer: BoxAgentAdapter::new(Arc::clone(&self.producer)),
                reviewer: BoxAgentAdapter::new(Arc::clone(&self.reviewer)),
                verifier: BoxAgentAdapter::new(Arc::clone(&self.verifier)),
            }
        }
    }

    fn engine<S: CheckpointStore>(
        script: &Script,
        human: QueuedHuman,
        store: S,
    ) -> WorkflowEngine<S, QueuedHuman> {
        let graph = revision_pipeline().compile().unwrap();
        let runner = StepRunner::new(script.agents(), ToolRegistry::new().with(Lookup), human);
        WorkflowEngine::new(graph, store, runner)
    }

    fn limits(review: u32, verify: u32) -> RunState {
        RunState::new(IterationLimits {
            max_review_rounds: review,
            max_verify_rounds: verify,
        })
    }

    #[tokio::test]
    async fn test_happy_path_completes() {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer).then_revision("v1"),
            ScriptedAdapter::new(AgentRole::Reviewer).then_verdict(true, "good"),
            ScriptedAdapter::new(AgentRole::Verifier).then_verdict(true, "accurate"),
        );
        let engine = engine(&script, QueuedHuman::new(["write about tides", "done"]), Arc::clone(&store));

        let id = RunId::new();
        let outcome = engine.run(id, RunState::default()).await.unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.next, Target::End);
        assert_eq!(outcome.steps_executed, 5);
        assert_eq!(outcome.state.round, 1);
        assert_eq!(outcome.state.drafts, vec!["v1"]);
        assert!(outcome.state.human_done);
        let roles: Vec<_> = outcome.state.conversation.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::Human, Role::Producer, Role::Reviewer, Role::Verifier]
        );
        assert_eq!(outcome.state.stage_exits.len(), 2);
        assert!(
            outcome
                .state
                .stage_exits
                .iter()
                .all(|e| e.reason == ExitReason::Approved)
        );

        let saved = store.load(&id).await.unwrap();
        assert_eq!(saved.step, 5);
        assert_eq!(saved.status, RunStatus::Completed);
        assert_eq!(saved.state, outcome.state);
    }

    #[tokio::test]
    async fn test_immediate_termination_produces_nothing() {
        let script = Script::idle();
        let engine = engine(&script, QueuedHuman::new(["  Bye "]), InMemoryCheckpointStore::new());

        let outcome = engine.run(RunId::new(), RunState::default()).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.steps_executed, 1);
        assert!(outcome.state.drafts.is_empty());
        assert!(outcome.state.conversation.is_empty());
        assert!(script.producer.seen().is_empty());
    }

    #[tokio::test]
    async fn test_review_ceiling_forces_verification() {
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer)
                .then_revision("v1")
                .then_revision("v2"),
            ScriptedAdapter::new(AgentRole::Reviewer)
                .then_verdict(false, "flat")
                .then_verdict(false, "still flat"),
            ScriptedAdapter::new(AgentRole::Verifier).then_verdict(true, "accurate"),
        );
        let engine = engine(&script, QueuedHuman::new(["task", "done"]), InMemoryCheckpointStore::new());

        let outcome = engine.run(RunId::new(), limits(2, 5)).await.unwrap();
        let state = outcome.state;
        assert_eq!(state.round, 2);
        assert_eq!(state.drafts, vec!["v1", "v2"]);
        assert!(!state.reviewer_ok);
        assert_eq!(state.stage_exits[0].stage, Stage::Review);
        assert_eq!(state.stage_exits[0].reason, ExitReason::Ceiling);
        assert_eq!(state.stage_exits[0].round, 2);
        assert_eq!(state.stage_exits[1].stage, Stage::Verify);
        assert_eq!(script.reviewer.remaining(), 0);
    }

    #[tokio::test]
    async fn test_eleven_rejections_stop_at_default_review_ceiling() {
        let mut producer = ScriptedAdapter::new(AgentRole::Producer);
        let mut reviewer = ScriptedAdapter::new(AgentRole::Reviewer);
        for i in 1..=11 {
            producer = producer.then_revision(format!("v{i}"));
            reviewer = reviewer.then_verdict(false, format!("rejection {i}"));
        }
        let script = Script::new(
            producer,
            reviewer,
            ScriptedAdapter::new(AgentRole::Verifier).then_verdict(false, "unsourced figure"),
        );
        let engine = engine(&script, QueuedHuman::new(["task", "done"]), InMemoryCheckpointStore::new());

        let outcome = engine.run(RunId::new(), RunState::default()).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(script.reviewer.seen().len(), 10);
        assert_eq!(script.reviewer.remaining(), 1);
        assert_eq!(script.producer.seen().len(), 10);
        assert_eq!(script.verifier.seen().len(), 1);

        let state = outcome.state;
        assert_eq!(state.round, 10);
        assert_eq!(state.latest_draft(), Some("v10"));
        let exits: Vec<_> = state
            .stage_exits
            .iter()
            .map(|e| (e.stage, e.reason, e.round))
            .collect();
        assert_eq!(
            exits,
            vec![
                (Stage::Review, ExitReason::Ceiling, 10),
                (Stage::Verify, ExitReason::Ceiling, 10),
            ]
        );
    }

    #[tokio::test]
    async fn test_verify_ceiling_returns_to_human() {
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer)
                .then_revision("v1")
                .then_revision("v2"),
            ScriptedAdapter::new(AgentRole::Reviewer).then_verdict(true, "good"),
            ScriptedAdapter::new(AgentRole::Verifier)
                .then_verdict(false, "wrong date")
                .then_verdict(false, "still wrong"),
        );
        let engine = engine(&script, QueuedHuman::new(["task", "done"]), InMemoryCheckpointStore::new());

        let outcome = engine.run(RunId::new(), limits(10, 2)).await.unwrap();
        assert!(outcome.is_completed());
        assert!(!outcome.state.verifier_ok);
        let last = outcome.state.stage_exits.last().copied().unwrap();
        assert_eq!(last.stage, Stage::Verify);
        assert_eq!(last.reason, ExitReason::Ceiling);
    }

    #[tokio::test]
    async fn test_verify_rejection_skips_approved_review() {
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer)
                .then_revision("v1")
                .then_revision("v2"),
            ScriptedAdapter::new(AgentRole::Reviewer).then_verdict(true, "good"),
            ScriptedAdapter::new(AgentRole::Verifier)
                .then_verdict(false, "wrong date")
                .then_verdict(true, "fixed"),
        );
        let engine = engine(&script, QueuedHuman::new(["task", "done"]), InMemoryCheckpointStore::new());

        let outcome = engine.run(RunId::new(), RunState::default()).await.unwrap();
        assert_eq!(outcome.state.round, 2);
        assert_eq!(script.reviewer.seen().len(), 1);
        assert_eq!(script.verifier.seen().len(), 2);

        // The verifier never sees human or reviewer turns.
        for context in script.verifier.seen() {
            assert!(
                context
                    .turns
                    .iter()
                    .all(|t| !matches!(t.role, Role::Human | Role::Reviewer))
            );
        }
    }

    #[tokio::test]
    async fn test_new_instruction_reopens_review() {
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer)
                .then_revision("v1")
                .then_revision("v2"),
            ScriptedAdapter::new(AgentRole::Reviewer)
                .then_verdict(true, "good")
                .then_verdict(true, "good again"),
            ScriptedAdapter::new(AgentRole::Verifier)
                .then_verdict(true, "ok")
                .then_verdict(true, "ok again"),
        );
        let human = QueuedHuman::new(["task", "make it shorter", "done"]);
        let engine = engine(&script, human, InMemoryCheckpointStore::new());

        let outcome = engine.run(RunId::new(), RunState::default()).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(script.reviewer.seen().len(), 2);
        assert_eq!(outcome.state.latest_draft(), Some("v2"));

        let asked = engine.runner.human().asked();
        assert_eq!(asked.len(), 3);
        assert_eq!(asked[0].latest_draft, None);
        assert_eq!(asked[1].latest_draft.as_deref(), Some("v1"));
        assert_eq!(asked[2].latest_draft.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_tool_loop_does_not_count_rounds() {
        let mut args = Map::new();
        args.insert("q".into(), json!("tides"));
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer)
                .then_tool_request_with_note(
                    "Checking tide tables.",
                    vec![ToolCall::new("lookup", "c1", args)],
                )
                .then_revision("v1"),
            ScriptedAdapter::new(AgentRole::Reviewer).then_verdict(true, "good"),
            ScriptedAdapter::new(AgentRole::Verifier).then_verdict(true, "sourced"),
        );
        let engine = engine(&script, QueuedHuman::new(["task", "done"]), InMemoryCheckpointStore::new());

        let outcome = engine.run(RunId::new(), RunState::default()).await.unwrap();
        let state = &outcome.state;
        assert_eq!(state.round, 1);
        assert_eq!(state.drafts.len(), 1);
        assert_eq!(state.collected_inputs, vec!["fact about tides"]);
        assert_eq!(state.conversation[1].tool_calls.len(), 1);
        assert_eq!(state.conversation[1].content, "Checking tide tables.");
        assert_eq!(state.conversation[2].role, Role::ToolResult);
        assert_eq!(state.conversation[2].call_id.as_deref(), Some("c1"));

        let second_call = &script.producer.seen()[1];
        assert_eq!(second_call.collected_inputs, vec!["fact about tides"]);
        assert_eq!(second_call.round, 0);
    }

    #[tokio::test]
    async fn test_interrupt_then_resume() {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer).then_revision("v1"),
            ScriptedAdapter::new(AgentRole::Reviewer).then_verdict(true, "good"),
            ScriptedAdapter::new(AgentRole::Verifier).then_verdict(true, "ok"),
        );
        let first = engine(&script, QueuedHuman::new(["task"]), Arc::clone(&store));

        let id = RunId::new();
        let suspended = first.run(id, RunState::default()).await.unwrap();
        assert_eq!(suspended.status, RunStatus::AwaitingHuman);
        assert_eq!(suspended.next, Target::node(graph::AWAIT_HUMAN));
        assert_eq!(suspended.steps_executed, 4);

        let saved = store.load(&id).await.unwrap();
        assert_eq!(saved.step, 4);
        assert_eq!(saved.status, RunStatus::AwaitingHuman);

        let idle = Script::idle();
        let second = engine(&idle, QueuedHuman::new(["done"]), Arc::clone(&store));
        let finished = second.resume(id).await.unwrap();
        assert!(finished.is_completed());
        assert_eq!(finished.steps_executed, 1);
        assert_eq!(finished.state.drafts, vec!["v1"]);

        // A completed run resumes to itself without calling anything.
        let again = second.resume(id).await.unwrap();
        assert!(again.is_completed());
        assert_eq!(again.steps_executed, 0);
        assert_eq!(again.step, finished.step);
    }

    #[tokio::test]
    async fn test_step_failure_keeps_last_checkpoint() {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let failing = Script::new(
            ScriptedAdapter::new(AgentRole::Producer)
                .then_error(AdapterError::Transport("503".into()))
                .then_error(AdapterError::Transport("503".into())),
            ScriptedAdapter::new(AgentRole::Reviewer),
            ScriptedAdapter::new(AgentRole::Verifier),
        );
        let first = engine(&failing, QueuedHuman::new(["task"]), Arc::clone(&store));

        let id = RunId::new();
        let err = first.run(id, RunState::default()).await.unwrap_err();
        match err {
            EngineError::StepFailed { node, attempts, .. } => {
                assert_eq!(node, graph::PRODUCE);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected StepFailed, got {other:?}"),
        }

        let saved = store.load(&id).await.unwrap();
        assert_eq!(saved.next, Target::node(graph::PRODUCE));
        assert_eq!(saved.step, 1);
        assert_eq!(saved.state.conversation.len(), 1);
        assert_eq!(saved.state.round, 0);

        let working = Script::new(
            ScriptedAdapter::new(AgentRole::Producer).then_revision("v1"),
            ScriptedAdapter::new(AgentRole::Reviewer).then_verdict(true, "good"),
            ScriptedAdapter::new(AgentRole::Verifier).then_verdict(true, "ok"),
        );
        let second = engine(&working, QueuedHuman::new(["done"]), Arc::clone(&store));
        let outcome = second.resume(id).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.state.round, 1);
        assert_eq!(outcome.state.conversation[0].content, "task");
    }

    /// Store that accepts `allowed` saves, then fails every write.
    struct FlakyStore {
        inner: Arc<InMemoryCheckpointStore>,
        allowed: usize,
        saves: AtomicUsize,
    }

    impl CheckpointStore for FlakyStore {
        async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
            if self.saves.fetch_add(1, Ordering::SeqCst) >= self.allowed {
                return Err(StoreError::Persistence("disk full".into()));
            }
            self.inner.save(checkpoint).await
        }

        async fn load(&self, run_id: &RunId) -> Result<Checkpoint, StoreError> {
            self.inner.load(run_id).await
        }

        async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError> {
            self.inner.exists(run_id).await
        }

        async fn list_runs(&self) -> Result<Vec<RunSummary>, StoreError> {
            self.inner.list_runs().await
        }

        async fn delete(&self, run_id: &RunId) -> Result<bool, StoreError> {
            self.inner.delete(run_id).await
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_stops_the_run() {
        let store = Arc::new(FlakyStore {
            inner: Arc::new(InMemoryCheckpointStore::new()),
            allowed: 2,
            saves: AtomicUsize::new(0),
        });
        let script = Script::new(
            ScriptedAdapter::new(AgentRole::Producer).then_revision("v1"),
            ScriptedAdapter::new(AgentRole::Reviewer),
            ScriptedAdapter::new(AgentRole::Verifier),
        );
        let engine = engine(&script, QueuedHuman::new(["task"]), Arc::clone(&store));

        let id = RunId::new();
        let err = engine.run(id, RunState::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));

        // Seed and the human step were written; the produce step was not.
        let saved = store.load(&id).await.unwrap();
        assert_eq!(saved.step, 1);
        assert_eq!(saved.next, Target::node(graph::PRODUCE));
        assert!(saved.state.drafts.is_empty());
        assert!(script.reviewer.seen().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_duplicate_runs() {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let script = Script::idle();
        let engine = engine(&script, QueuedHuman::new(["done"]), Arc::clone(&store));

        let missing = RunId::new();
        assert!(matches!(
            engine.resume(missing).await,
            Err(EngineError::RunNotFound(id)) if id == missing
        ));

        let id = RunId::new();
        engine.run(id, RunState::default()).await.unwrap();
        assert!(matches!(
            engine.run(id, RunState::default()).await,
            Err(EngineError::RunExists(existing)) if existing == id
        ));
    }

    #[tokio::test]
    async fn test_checkpoint_naming_unknown_node_is_rejected() {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let id = RunId::new();
        let now = chrono::Utc::now();
        store
            .save(&Checkpoint {
                run_id: id,
                next: Target::node("ghost"),
                status: RunStatus::Running,
                step: 3,
                state: RunState::default(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let script = Script::idle();
        let engine = engine(&script, QueuedHuman::default(), Arc::clone(&store));
        assert!(matches!(
            engine.resume(id).await,
            Err(EngineError::Graph(GraphError::UnknownNode(name))) if name == "ghost"
        ));
    }

    /// Answers from the run state alone, so a re-executed node gets the same
    /// outcome it got the first time.
    struct RoundDriven(AgentRole);

    impl AgentAdapter for RoundDriven {
        fn role(&self) -> AgentRole {
            self.0
        }

        async fn invoke(&self, context: &AgentContext) -> Result<AgentOutcome, AdapterError> {
            Ok(match self.0 {
                AgentRole::Producer if context.collected_inputs.is_empty() => {
                    let mut args = Map::new();
                    args.insert("q".into(), json!("tides"));
                    AgentOutcome::ToolRequest {
                        content: String::new(),
                        calls: vec![ToolCall::new("lookup", "c1", args)],
                    }
                }
                AgentRole::Producer => AgentOutcome::Revision {
                    text: format!("draft {}", context.round + 1),
                    rationale: String::new(),
                },
                AgentRole::Reviewer => AgentOutcome::Verdict {
                    approved: context.round >= 2,
                    feedback: format!("review of round {}", context.round),
                },
                AgentRole::Verifier => AgentOutcome::Verdict {
                    approved: context.round >= 3,
                    feedback: format!("check of round {}", context.round),
                },
            })
        }
    }

    /// Gives the task until a draft exists, then finishes.
    struct TaskThenDone;

    impl HumanChannel for TaskThenDone {
        async fn ask(&self, prompt: &HumanPrompt) -> Result<HumanReply, HumanError> {
            let reply = if prompt.latest_draft.is_none() {
                "explain the tides"
            } else {
                "done"
            };
            Ok(HumanReply::Message(reply.to_string()))
        }
    }

    fn round_driven<S: CheckpointStore>(store: S) -> WorkflowEngine<S, TaskThenDone> {
        let agents = Agents {
            producer: BoxAgentAdapter::new(RoundDriven(AgentRole::Producer)),
            reviewer: BoxAgentAdapter::new(RoundDriven(AgentRole::Reviewer)),
            verifier: BoxAgentAdapter::new(RoundDriven(AgentRole::Verifier)),
        };
        let graph = revision_pipeline().compile().unwrap();
        let runner = StepRunner::new(agents, ToolRegistry::new().with(Lookup), TaskThenDone);
        WorkflowEngine::new(graph, store, runner)
    }

    #[tokio::test]
    async fn test_resume_after_any_failed_write_matches_uninterrupted_run() {
        let counted = Arc::new(FlakyStore {
            inner: Arc::new(InMemoryCheckpointStore::new()),
            allowed: usize::MAX,
            saves: AtomicUsize::new(0),
        });
        let baseline = round_driven(Arc::clone(&counted))
            .run(RunId::new(), RunState::default())
            .await
            .unwrap();
        assert!(baseline.is_completed());
        assert_eq!(baseline.state.round, 3);
        assert_eq!(baseline.state.stage_exits.len(), 2);
        let total_saves = counted.saves.load(Ordering::SeqCst);
        assert_eq!(total_saves as u64, baseline.step + 1);

        // The seed write (k = 0) never produces a checkpoint to resume from.
        for allowed in 1..total_saves {
            let inner = Arc::new(InMemoryCheckpointStore::new());
            let flaky = Arc::new(FlakyStore {
                inner: Arc::clone(&inner),
                allowed,
                saves: AtomicUsize::new(0),
            });

            let id = RunId::new();
            let err = round_driven(flaky).run(id, RunState::default()).await.unwrap_err();
            assert!(matches!(err, EngineError::Persistence(_)), "write {allowed}: {err:?}");
            assert_eq!(inner.load(&id).await.unwrap().step, allowed as u64 - 1);

            let resumed = round_driven(Arc::clone(&inner)).resume(id).await.unwrap();
            assert!(resumed.is_completed(), "write {allowed}");
            assert_eq!(resumed.step, baseline.step, "write {allowed}");
            assert_eq!(resumed.state, baseline.state, "write {allowed}");
        }
    }
}
