//! Translation between conversation turns and Chat Completions messages.

use redline_types::agent::AgentRole;
use redline_types::conversation::{Role, ToolCall, Turn};
use redline_types::error::AdapterError;
use serde_json::{Map, Value};

use crate::llm::openai::types::{ChatMessage, WireFunctionCall, WireToolCall};

const REVIEW_PREFIX: &str = "Editor feedback:";
const VERIFY_PREFIX: &str = "Fact-check feedback:";

// ---------------------------------------------------------------------------
// Producer view
// ---------------------------------------------------------------------------

/// Messages for the producer: its own turns are assistant messages, tool
/// output is answered by call id, and judge feedback arrives as user text.
pub fn producer_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns.iter().map(producer_message).collect()
}

fn producer_message(turn: &Turn) -> ChatMessage {
    match turn.role {
        Role::Human => ChatMessage::user(&turn.content),
        Role::Producer if !turn.tool_calls.is_empty() => ChatMessage {
            role: "assistant".to_string(),
            content: (!turn.content.is_empty()).then(|| turn.content.clone()),
            tool_calls: turn.tool_calls.iter().map(to_wire_call).collect(),
            tool_call_id: None,
        },
        Role::Producer => ChatMessage::assistant(&turn.content),
        Role::Reviewer => ChatMessage::user(format!("{REVIEW_PREFIX}\n{}", turn.content)),
        Role::Verifier => ChatMessage::user(format!("{VERIFY_PREFIX}\n{}", turn.content)),
        Role::ToolResult => {
            let content = if turn.is_error {
                format!("error: {}", turn.content)
            } else {
                turn.content.clone()
            };
            match &turn.call_id {
                Some(call_id) => ChatMessage::tool(call_id, content),
                None => ChatMessage::user(format!("Tool output:\n{content}")),
            }
        }
    }
}

fn to_wire_call(call: &ToolCall) -> WireToolCall {
    WireToolCall {
        id: call.call_id.clone(),
        kind: "function".to_string(),
        function: WireFunctionCall {
            name: call.name.clone(),
            arguments: Value::Object(call.arguments.clone()).to_string(),
        },
    }
}

/// Parse the model's function calls into tool calls.
///
/// Arguments must decode to a JSON object; an empty string counts as no
/// arguments.
pub fn parse_tool_calls(calls: &[WireToolCall]) -> Result<Vec<ToolCall>, AdapterError> {
    calls
        .iter()
        .map(|call| {
            let raw = call.function.arguments.trim();
            let arguments = if raw.is_empty() {
                Map::new()
            } else {
                serde_json::from_str::<Map<String, Value>>(raw).map_err(|e| {
                    AdapterError::Malformed(format!(
                        "arguments for '{}' are not a JSON object: {e}",
                        call.function.name
                    ))
                })?
            };
            Ok(ToolCall::new(&call.function.name, &call.id, arguments))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Judge view
// ---------------------------------------------------------------------------

/// Messages for a reviewer or verifier.
///
/// Drafts are shown as user content so the judge never continues the
/// producer's voice. Raw tool traffic is dropped; gathered sources are given
/// once, up front.
pub fn judge_messages(
    judge: AgentRole,
    turns: &[Turn],
    collected_inputs: &[String],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 2);

    if !collected_inputs.is_empty() {
        let sources = collected_inputs
            .iter()
            .enumerate()
            .map(|(i, source)| format!("[{}]\n{source}", i + 1))
            .collect::<Vec<_>>()
            .join("\n\n");
        messages.push(ChatMessage::user(format!("Sources:\n\n{sources}")));
    }

    for turn in turns {
        let message = match turn.role {
            Role::Human => ChatMessage::user(format!("User request:\n{}", turn.content)),
            Role::Producer if !turn.tool_calls.is_empty() || turn.content.trim().is_empty() => continue,
            Role::Producer => ChatMessage::user(format!("Draft:\n{}", turn.content)),
            Role::Reviewer if judge == AgentRole::Reviewer => ChatMessage::assistant(&turn.content),
            Role::Verifier if judge == AgentRole::Verifier => ChatMessage::assistant(&turn.content),
            Role::Reviewer => ChatMessage::user(format!("{REVIEW_PREFIX}\n{}", turn.content)),
            Role::Verifier => ChatMessage::user(format!("{VERIFY_PREFIX}\n{}", turn.content)),
            Role::ToolResult => continue,
        };
        messages.push(message);
    }

    messages.push(ChatMessage::user("Judge the latest draft."));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_producer_messages_map_roles() {
        let call = ToolCall::new("fetch_article", "call_1", args(json!({"url": "https://a.example"})));
        let turns = vec![
            Turn::human("cover https://a.example"),
            Turn::producer_tool_request("", vec![call]),
            Turn::tool_result("call_1", "article body"),
            Turn::producer("draft"),
            Turn::reviewer("weak hook"),
            Turn::verifier("wrong date"),
        ];
        let messages = producer_messages(&turns);
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool", "assistant", "user", "user"]);

        assert!(messages[1].content.is_none());
        assert_eq!(messages[1].tool_calls[0].id, "call_1");
        let sent: Value = serde_json::from_str(&messages[1].tool_calls[0].function.arguments).unwrap();
        assert_eq!(sent["url"], "https://a.example");

        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
        assert!(messages[4].content.as_deref().unwrap().starts_with("Editor feedback:"));
        assert!(messages[5].content.as_deref().unwrap().starts_with("Fact-check feedback:"));
    }

    #[test]
    fn test_tool_errors_are_marked() {
        let messages = producer_messages(&[Turn::tool_error("c9", "timed out")]);
        assert_eq!(messages[0].content.as_deref(), Some("error: timed out"));
    }

    #[test]
    fn test_parse_tool_calls() {
        let wire = vec![
            WireToolCall {
                id: "a".into(),
                kind: "function".into(),
                function: WireFunctionCall {
                    name: "fetch_article".into(),
                    arguments: r#"{"url":"https://b.example"}"#.into(),
                },
            },
            WireToolCall {
                id: "b".into(),
                kind: "function".into(),
                function: WireFunctionCall {
                    name: "noop".into(),
                    arguments: String::new(),
                },
            },
        ];
        let calls = parse_tool_calls(&wire).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments["url"], "https://b.example");
        assert_eq!(calls[1].call_id, "b");
        assert!(calls[1].arguments.is_empty());
    }

    #[test]
    fn test_parse_tool_calls_rejects_non_object_arguments() {
        let wire = vec![WireToolCall {
            id: "a".into(),
            kind: "function".into(),
            function: WireFunctionCall {
                name: "fetch_article".into(),
                arguments: "[1, 2]".into(),
            },
        }];
        assert!(matches!(parse_tool_calls(&wire), Err(AdapterError::Malformed(_))));
    }

    #[test]
    fn test_judge_messages_put_sources_first() {
        let turns = vec![
            Turn::human("neutral tone"),
            Turn::producer_tool_request(
                "Fetching the article.",
                vec![ToolCall::new("fetch_article", "c1", Map::new())],
            ),
            Turn::tool_result("c1", "source"),
            Turn::producer("draft"),
            Turn::reviewer("shorter please"),
        ];
        // Tool traffic, including the note sent with the request, is not shown.
        let messages = judge_messages(AgentRole::Reviewer, &turns, &["source".to_string()]);
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "user", "user", "assistant", "user"]);
        assert!(messages[0].content.as_deref().unwrap().starts_with("Sources:"));
        assert_eq!(messages[2].content.as_deref(), Some("Draft:\ndraft"));
        assert_eq!(messages[4].content.as_deref(), Some("Judge the latest draft."));
    }

    #[test]
    fn test_judge_messages_without_sources() {
        let messages = judge_messages(AgentRole::Verifier, &[Turn::producer("draft")], &[]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.as_deref(), Some("Draft:\ndraft"));
    }
}
