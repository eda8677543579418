//! Run state and checkpoint types.
//!
//! A run owns exactly one [`RunState`]. Between invocations the state lives
//! in a [`Checkpoint`] together with the node that should execute next.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::{Role, ToolCall, Turn};

/// Unique identifier for a run, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Where execution goes next: a named node or the terminal marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Node(String),
    End,
}

impl Target {
    /// Marker used for the terminal target in persisted records.
    pub const END_MARKER: &'static str = "END";

    pub fn node(name: impl Into<String>) -> Self {
        Target::Node(name.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Target::End)
    }

    pub fn as_node(&self) -> Option<&str> {
        match self {
            Target::Node(name) => Some(name),
            Target::End => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(name) => write!(f, "{name}"),
            Target::End => write!(f, "{}", Self::END_MARKER),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("empty node name".to_string()),
            Self::END_MARKER => Ok(Target::End),
            name => Ok(Target::Node(name.to_string())),
        }
    }
}

impl Serialize for Target {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hard iteration ceilings for the two feedback loops.
///
/// Both ceilings are measured against the shared `round` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationLimits {
    #[serde(default = "default_max_review_rounds")]
    pub max_review_rounds: u32,
    #[serde(default = "default_max_verify_rounds")]
    pub max_verify_rounds: u32,
}

fn default_max_review_rounds() -> u32 {
    10
}

fn default_max_verify_rounds() -> u32 {
    5
}

impl Default for IterationLimits {
    fn default() -> Self {
        Self {
            max_review_rounds: default_max_review_rounds(),
            max_verify_rounds: default_max_verify_rounds(),
        }
    }
}

/// A gated stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Review,
    Verify,
}

/// Why a stage let the run move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Approved,
    Ceiling,
}

/// Record of a stage being passed, kept so ceiling exits are visible afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageExit {
    pub stage: Stage,
    pub round: u32,
    pub reason: ExitReason,
}

/// The single mutable record of a run.
///
/// All sequences are append-only. Only the workflow engine mutates this,
/// and only by applying a step's delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub conversation: Vec<Turn>,
    #[serde(default)]
    pub drafts: Vec<String>,
    #[serde(default)]
    pub collected_inputs: Vec<String>,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub reviewer_ok: bool,
    #[serde(default)]
    pub verifier_ok: bool,
    #[serde(default)]
    pub human_done: bool,
    #[serde(default)]
    pub limits: IterationLimits,
    #[serde(default)]
    pub stage_exits: Vec<StageExit>,
}

impl RunState {
    /// Empty state for a fresh run.
    pub fn new(limits: IterationLimits) -> Self {
        Self {
            conversation: Vec::new(),
            drafts: Vec::new(),
            collected_inputs: Vec::new(),
            round: 0,
            reviewer_ok: false,
            verifier_ok: false,
            human_done: false,
            limits,
            stage_exits: Vec::new(),
        }
    }

    /// The most recent draft, if any production round has completed.
    pub fn latest_draft(&self) -> Option<&str> {
        self.drafts.last().map(String::as_str)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.conversation.last()
    }

    /// Tool calls of the latest turn when it is an unanswered producer request.
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match self.conversation.last() {
            Some(turn) if turn.role == Role::Producer => &turn.tool_calls,
            _ => &[],
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(IterationLimits::default())
    }
}

/// Coarse lifecycle status derived from a checkpoint's next node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Between agent steps; resumable immediately.
    Running,
    /// Suspended at the human gate.
    AwaitingHuman,
    /// Reached the terminal marker.
    Completed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::AwaitingHuman => write!(f, "awaiting_human"),
            RunStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "awaiting_human" => Ok(RunStatus::AwaitingHuman),
            "completed" => Ok(RunStatus::Completed),
            other => Err(format!("invalid run status: '{other}'")),
        }
    }
}

/// One persisted snapshot: the full state plus the node to execute next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: RunId,
    pub next: Target,
    pub status: RunStatus,
    /// Number of node transitions completed so far (0 for a freshly seeded run).
    pub step: u64,
    pub state: RunState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight listing entry for stored runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub next: Target,
    pub status: RunStatus,
    pub step: u64,
    pub updated_at: DateTime<Utc>,
}
