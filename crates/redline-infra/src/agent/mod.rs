//! LLM-backed agent adapters.
//!
//! - `LlmProducer`: drafts and revises, may request tools
//! - `LlmJudge`: reviewer (style) and verifier (facts) with structured verdicts

pub mod convert;
pub mod judge;
pub mod producer;
pub mod prompt;

use std::sync::Arc;

use redline_core::agent::box_adapter::BoxAgentAdapter;
use redline_core::tool::ToolRegistry;
use redline_core::workflow::steps::Agents;
use redline_types::config::RedlineConfig;
use redline_types::error::AdapterError;

pub use judge::LlmJudge;
pub use producer::LlmProducer;

use crate::llm::LlmError;
use crate::llm::openai::OpenAiClient;

/// Wire the three roles to one shared client.
pub fn build_agents(config: &RedlineConfig, client: Arc<OpenAiClient>, tools: &ToolRegistry) -> Agents {
    Agents {
        producer: BoxAgentAdapter::new(LlmProducer::new(
            Arc::clone(&client),
            config.agents.producer.clone(),
            &tools.specs(),
        )),
        reviewer: BoxAgentAdapter::new(LlmJudge::reviewer(
            Arc::clone(&client),
            config.agents.reviewer.clone(),
        )),
        verifier: BoxAgentAdapter::new(LlmJudge::verifier(client, config.agents.verifier.clone())),
    }
}

/// Map a client failure onto the adapter contract.
///
/// Unparseable or empty provider replies count as malformed output; every
/// other failure is a transport problem.
fn llm_failure(err: LlmError) -> AdapterError {
    match err {
        LlmError::Deserialization(_) | LlmError::EmptyResponse => AdapterError::Malformed(err.to_string()),
        other => AdapterError::Transport(other.to_string()),
    }
}
