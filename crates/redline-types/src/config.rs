//! Configuration types for redline.
//!
//! `RedlineConfig` represents the top-level `config.toml` that controls the
//! iteration ceilings, retry budget, termination vocabulary, model settings
//! for each agent, and the fetch tool.

use serde::{Deserialize, Serialize};

use crate::agent::AgentConfig;
use crate::run::IterationLimits;

/// Top-level configuration.
///
/// Loaded from `~/.redline/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedlineConfig {
    #[serde(default)]
    pub limits: IterationLimits,

    /// Total attempts per agent call (2 = one immediate retry).
    #[serde(default = "default_adapter_attempts")]
    pub adapter_attempts: u32,

    /// Case-insensitive words that end the run at the human gate.
    #[serde(default = "default_termination_words")]
    pub termination_words: Vec<String>,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_adapter_attempts() -> u32 {
    2
}

fn default_termination_words() -> Vec<String> {
    ["exit", "quit", "stop", "bye", "done"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for RedlineConfig {
    fn default() -> Self {
        Self {
            limits: IterationLimits::default(),
            adapter_attempts: default_adapter_attempts(),
            termination_words: default_termination_words(),
            llm: LlmConfig::default(),
            agents: AgentsConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Connection settings for the OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Model settings per agent role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_producer")]
    pub producer: AgentConfig,
    #[serde(default = "default_reviewer")]
    pub reviewer: AgentConfig,
    #[serde(default = "default_verifier")]
    pub verifier: AgentConfig,
}

fn default_producer() -> AgentConfig {
    AgentConfig::with_temperature(0.7)
}

fn default_reviewer() -> AgentConfig {
    AgentConfig::with_temperature(0.3)
}

fn default_verifier() -> AgentConfig {
    AgentConfig::with_temperature(0.0)
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            producer: default_producer(),
            reviewer: default_reviewer(),
            verifier: default_verifier(),
        }
    }
}

/// Settings for the article fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// Extracted text is truncated to this many characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_chars() -> usize {
    20_000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            max_chars: default_max_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = RedlineConfig::default();
        assert_eq!(config.limits.max_review_rounds, 10);
        assert_eq!(config.limits.max_verify_rounds, 5);
        assert_eq!(config.adapter_attempts, 2);
        assert!(config.termination_words.iter().any(|w| w == "exit"));
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert!((config.agents.producer.temperature - 0.7).abs() < f64::EPSILON);
        assert!((config.agents.reviewer.temperature - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: RedlineConfig = toml::from_str("").unwrap();
        assert_eq!(config.adapter_attempts, 2);
        assert_eq!(config.fetch.max_chars, 20_000);
        assert_eq!(config.termination_words.len(), 5);
    }

    #[test]
    fn test_deserialize_partial_overrides() {
        let toml_str = r#"
adapter_attempts = 3
termination_words = ["ship it"]

[limits]
max_review_rounds = 4

[agents.reviewer]
model = "gpt-4o"
temperature = 0.1

[fetch]
timeout_secs = 5
"#;
        let config: RedlineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.adapter_attempts, 3);
        assert_eq!(config.termination_words, vec!["ship it".to_string()]);
        assert_eq!(config.limits.max_review_rounds, 4);
        assert_eq!(config.limits.max_verify_rounds, 5);
        assert_eq!(config.agents.reviewer.model, "gpt-4o");
        assert!((config.agents.producer.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.fetch.max_chars, 20_000);
    }
}
