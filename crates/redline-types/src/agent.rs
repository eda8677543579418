//! Agent adapter contract types.
//!
//! Every agent invocation yields exactly one [`AgentOutcome`]. Producers
//! return a revision or a tool request; reviewers and verifiers return a
//! verdict.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::conversation::{Role, ToolCall};

/// The three agent roles driven by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Producer,
    Reviewer,
    Verifier,
}

impl AgentRole {
    /// Conversation role used for turns this agent appends.
    pub fn turn_role(&self) -> Role {
        match self {
            AgentRole::Producer => Role::Producer,
            AgentRole::Reviewer => Role::Reviewer,
            AgentRole::Verifier => Role::Verifier,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Producer => write!(f, "producer"),
            AgentRole::Reviewer => write!(f, "reviewer"),
            AgentRole::Verifier => write!(f, "verifier"),
        }
    }
}

/// Result of one agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentOutcome {
    /// A finished draft (producer only).
    Revision { text: String, rationale: String },
    /// The producer needs tool output before it can write. `content` is any
    /// text sent alongside the calls and may be empty.
    ToolRequest { content: String, calls: Vec<ToolCall> },
    /// Approve/reject decision (reviewer and verifier only).
    Verdict { approved: bool, feedback: String },
}

impl AgentOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentOutcome::Revision { .. } => "revision",
            AgentOutcome::ToolRequest { .. } => "tool_request",
            AgentOutcome::Verdict { .. } => "verdict",
        }
    }
}

/// Structured verdict shape requested from reviewer/verifier models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerdictPayload {
    /// Whether the draft passes this gate.
    pub approved: bool,
    /// Reasons for approval, or specific actionable problems to fix.
    pub feedback: String,
}

/// Per-agent model settings passed into each adapter's constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl AgentConfig {
    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            model: default_model(),
            temperature,
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::with_temperature(0.0)
    }
}
