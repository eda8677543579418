//! Conversation log types.
//!
//! The conversation is an ordered, append-only sequence of [`Turn`]s. It is
//! the only context handed to agent adapters, so every piece of information an
//! agent needs (instructions, drafts, feedback, tool output) lives here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Producer,
    Reviewer,
    Verifier,
    ToolResult,
}

impl Role {
    /// Tag recorded in exported run records for the originating agent.
    ///
    /// Human and tool turns have no agent behind them.
    pub fn agent_tag(&self) -> Option<&'static str> {
        match self {
            Role::Producer => Some("producer"),
            Role::Reviewer => Some("reviewer"),
            Role::Verifier => Some("verifier"),
            Role::Human | Role::ToolResult => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Human => write!(f, "human"),
            Role::Producer => write!(f, "producer"),
            Role::Reviewer => write!(f, "reviewer"),
            Role::Verifier => write!(f, "verifier"),
            Role::ToolResult => write!(f, "tool_result"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Role::Human),
            "producer" => Ok(Role::Producer),
            "reviewer" => Ok(Role::Reviewer),
            "verifier" => Ok(Role::Verifier),
            "tool_result" => Ok(Role::ToolResult),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

/// A tool invocation requested by the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registered tool name (e.g. "fetch_article").
    pub name: String,
    /// Named arguments.
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
    /// Identifier used to correlate the result turn with this call.
    pub call_id: String,
}

impl ToolCall {
    pub fn new(
        name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: call_id.into(),
        }
    }
}

/// One entry in the conversation log. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Tool invocations requested in this turn (producer turns only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool-result turns: the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// For tool-result turns: true when the tool failed and `content` is the error.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Turn {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            call_id: None,
            is_error: false,
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::plain(Role::Human, content)
    }

    pub fn producer(content: impl Into<String>) -> Self {
        Self::plain(Role::Producer, content)
    }

    /// A producer turn that asks for tools instead of delivering a draft.
    pub fn producer_tool_request(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::plain(Role::Producer, content)
        }
    }

    pub fn reviewer(feedback: impl Into<String>) -> Self {
        Self::plain(Role::Reviewer, feedback)
    }

    pub fn verifier(feedback: impl Into<String>) -> Self {
        Self::plain(Role::Verifier, feedback)
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: Some(call_id.into()),
            ..Self::plain(Role::ToolResult, content)
        }
    }

    pub fn tool_error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: Some(call_id.into()),
            is_error: true,
            ..Self::plain(Role::ToolResult, error)
        }
    }

    /// Whether this turn requests tool invocations.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
