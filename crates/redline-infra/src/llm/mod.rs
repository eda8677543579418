//! LLM provider clients.

pub mod openai;

use thiserror::Error;

/// Errors from chat completion calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("failed to parse provider response: {0}")]
    Deserialization(String),

    #[error("provider returned no choices")]
    EmptyResponse,

    #[error("missing API key: environment variable {0} is not set")]
    MissingApiKey(String),
}
