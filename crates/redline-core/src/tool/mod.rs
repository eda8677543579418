//! Tool abstractions for the producer's tool sub-loop.
//!
//! A tool takes named arguments and returns text. The engine never fails a
//! run because of a tool: errors are turned into error-flagged result turns
//! so the producer can react to them.

pub mod registry;

use std::future::Future;
use std::pin::Pin;

use redline_types::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use registry::{ToolInvocation, ToolRegistry};

/// Advertised tool signature, sent to models that support function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object.
    pub parameters: Value,
}

/// A callable capability available to the producer.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema describing the named arguments.
    fn parameters(&self) -> Value;

    fn call(
        &self,
        arguments: &Map<String, Value>,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// Object-safe version of [`Tool`] with a boxed future.
pub trait ToolDyn: Send + Sync {
    fn name(&self) -> &str;

    fn spec(&self) -> ToolSpec;

    fn call_boxed<'a>(
        &'a self,
        arguments: &'a Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Tool::name(self).to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    fn call_boxed<'a>(
        &'a self,
        arguments: &'a Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>> {
        Box::pin(self.call(arguments))
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    match arguments.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(ToolError::InvalidArguments(format!("'{key}' is empty"))),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a string, got {other}"
        ))),
        None => Err(ToolError::InvalidArguments(format!("missing '{key}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str() {
        let args = json!({"url": "https://example.com", "blank": " ", "n": 3});
        let args = args.as_object().unwrap();
        assert_eq!(required_str(args, "url").unwrap(), "https://example.com");
        assert!(matches!(
            required_str(args, "blank"),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            required_str(args, "n"),
            Err(ToolError::InvalidArguments(_))
        ));
        let err = required_str(args, "missing").unwrap_err();
        assert_eq!(err.to_string(), "invalid arguments: missing 'missing'");
    }
}
