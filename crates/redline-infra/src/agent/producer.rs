//! LLM-backed producer.
//!
//! Sends the full conversation with the registered tools advertised. A reply
//! with function calls becomes a tool request; a text reply is split into
//! draft and rationale.

use std::sync::Arc;

use redline_core::agent::{AgentAdapter, AgentContext};
use redline_core::tool::ToolSpec;
use redline_types::agent::{AgentConfig, AgentOutcome, AgentRole};
use redline_types::error::AdapterError;

use super::convert::{parse_tool_calls, producer_messages};
use super::llm_failure;
use super::prompt::{PRODUCER_PROMPT, parse_revision};
use crate::llm::openai::OpenAiClient;
use crate::llm::openai::types::{ChatMessage, ChatRequest, ToolDefinition};

pub struct LlmProducer {
    client: Arc<OpenAiClient>,
    config: AgentConfig,
    tools: Vec<ToolDefinition>,
}

impl LlmProducer {
    pub fn new(client: Arc<OpenAiClient>, config: AgentConfig, tools: &[ToolSpec]) -> Self {
        Self {
            client,
            config,
            tools: tool_definitions(tools),
        }
    }

    fn request(&self, context: &AgentContext) -> ChatRequest {
        let mut messages = Vec::with_capacity(context.turns.len() + 1);
        messages.push(ChatMessage::system(PRODUCER_PROMPT));
        messages.extend(producer_messages(&context.turns));

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(self.config.temperature),
            max_completion_tokens: Some(self.config.max_tokens),
            tools: self.tools.clone(),
            response_format: None,
        }
    }
}

fn tool_definitions(specs: &[ToolSpec]) -> Vec<ToolDefinition> {
    specs
        .iter()
        .map(|spec| ToolDefinition::function(&spec.name, &spec.description, spec.parameters.clone()))
        .collect()
}

/// Turn the model's reply into an outcome.
fn interpret(reply: ChatMessage) -> Result<AgentOutcome, AdapterError> {
    if !reply.tool_calls.is_empty() {
        let calls = parse_tool_calls(&reply.tool_calls)?;
        let content = reply.content.map(|c| c.trim().to_string()).unwrap_or_default();
        return Ok(AgentOutcome::ToolRequest { content, calls });
    }

    let content = reply.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(AdapterError::Malformed(
            "producer replied with neither text nor tool calls".to_string(),
        ));
    }
    let (text, rationale) = parse_revision(&content);
    Ok(AgentOutcome::Revision { text, rationale })
}

impl AgentAdapter for LlmProducer {
    fn role(&self) -> AgentRole {
        AgentRole::Producer
    }

    async fn invoke(&self, context: &AgentContext) -> Result<AgentOutcome, AdapterError> {
        let request = self.request(context);
        let reply = self.client.chat(&request).await.map_err(llm_failure)?;
        let outcome = interpret(reply)?;
        tracing::debug!(
            model = %self.config.model,
            round = context.round,
            outcome = outcome.kind(),
            "producer replied"
        );
        Ok(outcome)
    }
}
