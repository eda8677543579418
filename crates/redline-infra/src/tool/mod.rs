//! Producer tools.

pub mod fetch;
pub mod length;

use redline_core::tool::ToolRegistry;
use redline_types::config::FetchConfig;
use redline_types::error::ToolError;

pub use fetch::{ArticleExtractor, FetchArticleTool};
pub use length::ScriptLengthTool;

/// Registry holding every built-in tool.
pub fn default_tools(fetch: &FetchConfig) -> Result<ToolRegistry, ToolError> {
    Ok(ToolRegistry::new()
        .with(FetchArticleTool::new(fetch)?)
        .with(ScriptLengthTool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tools() {
        let registry = default_tools(&FetchConfig::default()).unwrap();
        assert!(registry.contains(fetch::FETCH_ARTICLE));
        assert!(registry.contains(length::SCRIPT_LENGTH));
        let names: Vec<String> = registry.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["fetch_article", "script_length"]);
    }
}
