//! LLM-backed reviewer and verifier.
//!
//! Both roles share one adapter: they differ only in system prompt and in
//! which of their own prior turns they get back as assistant messages. The
//! reply is constrained to the [`VerdictPayload`] JSON schema.

use std::sync::Arc;

use redline_core::agent::{AgentAdapter, AgentContext};
use redline_types::agent::{AgentConfig, AgentOutcome, AgentRole, VerdictPayload};
use redline_types::error::AdapterError;
use serde_json::Value;

use super::convert::judge_messages;
use super::llm_failure;
use super::prompt::{REVIEWER_PROMPT, VERIFIER_PROMPT};
use crate::llm::openai::OpenAiClient;
use crate::llm::openai::types::{ChatMessage, ChatRequest, JsonSchemaFormat, ResponseFormat};

pub struct LlmJudge {
    role: AgentRole,
    client: Arc<OpenAiClient>,
    config: AgentConfig,
    system_prompt: &'static str,
}

impl LlmJudge {
    pub fn reviewer(client: Arc<OpenAiClient>, config: AgentConfig) -> Self {
        Self {
            role: AgentRole::Reviewer,
            client,
            config,
            system_prompt: REVIEWER_PROMPT,
        }
    }

    pub fn verifier(client: Arc<OpenAiClient>, config: AgentConfig) -> Self {
        Self {
            role: AgentRole::Verifier,
            client,
            config,
            system_prompt: VERIFIER_PROMPT,
        }
    }

    fn request(&self, context: &AgentContext) -> Result<ChatRequest, AdapterError> {
        let mut messages = Vec::with_capacity(context.turns.len() + 3);
        messages.push(ChatMessage::system(self.system_prompt));
        messages.extend(judge_messages(self.role, &context.turns, &context.collected_inputs));

        Ok(ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(self.config.temperature),
            max_completion_tokens: Some(self.config.max_tokens),
            tools: Vec::new(),
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: "verdict".to_string(),
                    schema: verdict_schema()?,
                    strict: true,
                },
            }),
        })
    }
}

/// JSON schema for [`VerdictPayload`] in the strict form providers accept.
pub fn verdict_schema() -> Result<Value, AdapterError> {
    let schema = schemars::schema_for!(VerdictPayload);
    let mut value = serde_json::to_value(schema)
        .map_err(|e| AdapterError::Malformed(format!("verdict schema: {e}")))?;
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    forbid_additional_properties(&mut value);
    Ok(value)
}

/// Set `additionalProperties: false` on every object schema.
fn forbid_additional_properties(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for child in map.values_mut() {
                forbid_additional_properties(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(forbid_additional_properties),
        _ => {}
    }
}

fn parse_verdict(content: Option<&str>) -> Result<AgentOutcome, AdapterError> {
    let raw = content.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AdapterError::Malformed("empty verdict".to_string()));
    }
    let payload: VerdictPayload = serde_json::from_str(raw)
        .map_err(|e| AdapterError::Malformed(format!("verdict is not valid JSON: {e}; raw: {raw}")))?;
    Ok(AgentOutcome::Verdict {
        approved: payload.approved,
        feedback: payload.feedback,
    })
}

impl AgentAdapter for LlmJudge {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn invoke(&self, context: &AgentContext) -> Result<AgentOutcome, AdapterError> {
        let request = self.request(context)?;
        let reply = self.client.chat(&request).await.map_err(llm_failure)?;
        let outcome = parse_verdict(reply.content.as_deref())?;
        if let AgentOutcome::Verdict { approved, .. } = &outcome {
            tracing::debug!(role = %self.role, model = %self.config.model, approved, "verdict received");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_types::conversation::Turn;
    use secrecy::SecretString;
    use std::time::Duration;

    fn client() -> Arc<OpenAiClient> {
        Arc::new(
            OpenAiClient::new(
                SecretString::from("sk-test".to_string()),
                "https://api.example.com/v1",
                Duration::from_secs(5),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_verdict_schema_is_strict() {
        let schema = verdict_schema().unwrap();
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"approved"));
        assert!(required.contains(&"feedback"));
    }

    #[test]
    fn test_parse_verdict() {
        let outcome = parse_verdict(Some(r#"{"approved": false, "feedback": "hook is flat"}"#)).unwrap();
        assert_eq!(
            outcome,
            AgentOutcome::Verdict {
                approved: false,
                feedback: "hook is flat".into(),
            }
        );
    }

    #[test]
    fn test_parse_verdict_rejects_prose() {
        assert!(matches!(
            parse_verdict(Some("Looks great, approved!")),
            Err(AdapterError::Malformed(_))
        ));
        assert!(matches!(parse_verdict(None), Err(AdapterError::Malformed(_))));
    }

    #[test]
    fn test_roles_use_their_own_prompt() {
        let context = AgentContext {
            role: AgentRole::Verifier,
            turns: vec![Turn::producer("draft")],
            collected_inputs: vec!["article".into()],
            round: 1,
        };
        let verifier = LlmJudge::verifier(client(), AgentConfig::default());
        assert_eq!(verifier.role(), AgentRole::Verifier);
        let request = verifier.request(&context).unwrap();
        assert_eq!(request.messages[0].content.as_deref(), Some(VERIFIER_PROMPT));
        assert!(request.response_format.is_some());
        assert!(request.tools.is_empty());

        let reviewer = LlmJudge::reviewer(client(), AgentConfig::default());
        let request = reviewer.request(&context).unwrap();
        assert_eq!(request.messages[0].content.as_deref(), Some(REVIEWER_PROMPT));
    }
}
