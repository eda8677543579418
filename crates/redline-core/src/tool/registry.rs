//! Tool registry and dispatch.

use std::collections::BTreeMap;

use redline_types::conversation::ToolCall;
use redline_types::error::ToolError;

use super::{Tool, ToolDyn, ToolSpec};

/// Result of running one requested tool call.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool: String,
    pub result: Result<String, ToolError>,
}

/// Name-indexed set of tools available to the producer.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn ToolDyn>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = Tool::name(&tool).to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_some() {
            tracing::warn!(tool = %name, "replaced previously registered tool");
        }
    }

    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Signatures of every registered tool, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    /// Run the calls in request order.
    ///
    /// Never fails as a whole: each call yields its own result, and unknown
    /// tools produce `ToolError::UnknownTool`.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolInvocation> {
        let mut invocations = Vec::with_capacity(calls.len());
        for call in calls {
            let result = match self.tools.get(&call.name) {
                Some(tool) => tool.call_boxed(&call.arguments).await,
                None => Err(ToolError::UnknownTool(call.name.clone())),
            };

            match &result {
                Ok(output) => tracing::debug!(
                    tool = %call.name,
                    call_id = %call.call_id,
                    chars = output.len(),
                    "tool call succeeded"
                ),
                Err(e) => tracing::warn!(
                    tool = %call.name,
                    call_id = %call.call_id,
                    error = %e,
                    "tool call failed"
                ),
            }

            invocations.push(ToolInvocation {
                call_id: call.call_id.clone(),
                tool: call.name.clone(),
                result,
            });
        }
        invocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::required_str;
    use serde_json::{Map, Value, json};

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text argument"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn call(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
            Ok(required_str(arguments, "text")?.to_string())
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_dispatch_preserves_order_and_isolates_errors() {
        let registry = ToolRegistry::new().with(Echo);
        let calls = vec![
            ToolCall::new("echo", "a", args(json!({"text": "one"}))),
            ToolCall::new("search", "b", Map::new()),
            ToolCall::new("echo", "c", Map::new()),
            ToolCall::new("echo", "d", args(json!({"text": "two"}))),
        ];

        let results = registry.dispatch(&calls).await;
        let ids: Vec<_> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(results[0].result.as_deref().unwrap(), "one");
        assert!(matches!(results[1].result, Err(ToolError::UnknownTool(_))));
        assert!(matches!(results[2].result, Err(ToolError::InvalidArguments(_))));
        assert_eq!(results[3].result.as_deref().unwrap(), "two");
    }

    #[test]
    fn test_specs_are_listed() {
        let registry = ToolRegistry::new().with(Echo);
        assert!(registry.contains("echo"));
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
        assert_eq!(specs[0].parameters["type"], "object");
    }
}
