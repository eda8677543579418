//! `script_length`: character and word counts for a draft.
//!
//! Lets the producer check the length target before handing a draft over.

use redline_core::tool::{Tool, required_str};
use redline_types::error::ToolError;
use serde_json::{Map, Value, json};

pub const SCRIPT_LENGTH: &str = "script_length";

pub struct ScriptLengthTool;

impl Tool for ScriptLengthTool {
    fn name(&self) -> &str {
        SCRIPT_LENGTH
    }

    fn description(&self) -> &str {
        "Count the characters and words of a script."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "script": { "type": "string", "description": "Full script text" }
            },
            "required": ["script"],
            "additionalProperties": false
        })
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        let script = required_str(arguments, "script")?;
        Ok(json!({
            "total_chars": script.chars().count(),
            "total_words": script.split_whitespace().count(),
        })
        .to_string())
    }
}
