//! [`ToolDyn`] and [`ToolRegistry`] — the sub-agent's textual tool surface.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while resolving or executing a tool.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The tool raised an error while executing. Per spec §4.3 this is
    /// converted by the sub-agent runner into an observation of the form
    /// `Error: tool '<name>' raised <ErrorClass>: <message>`.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A transient failure (store connection reset, timeout). Retryable
    /// per spec §5/§7.
    #[error("transient error: {0}")]
    Transient(String),

    /// The literal `Action Input` string was malformed for this tool.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ToolError {
    /// Whether retrying this call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Transient(_))
    }
}

/// A named capability callable by the sub-agent with a single-line text
/// argument (spec Glossary "Tool"), returning formatted text.
///
/// Implemented by `axon-retrieval`'s semantic-search, structured-query, and
/// web-search tools.
#[async_trait]
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name, as it appears in `Action:` lines.
    fn name(&self) -> &str;

    /// Human-readable description, surfaced to the Planner/sub-agent system
    /// prompt so the model knows when to reach for this tool.
    fn description(&self) -> &str;

    /// Execute the tool against the literal `Action Input` string.
    async fn call(&self, input: &str) -> Result<String, ToolError>;
}

/// Registry of tools available to one sub-agent run, keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, overwriting any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// The set of registered tool names, for the sub-agent's allowed-tool
    /// set and system-prompt rendering.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        async fn call(&self, input: &str) -> Result<String, ToolError> {
            Ok(input.to_string())
        }
    }

    struct FailTool;

    #[async_trait]
    impl ToolDyn for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        async fn call(&self, _input: &str) -> Result<String, ToolError> {
            Err(ToolError::ExecutionFailed("always fails".into()))
        }
    }

    #[test]
    fn registry_add_and_get() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn registry_overwrite_keeps_single_entry() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn registry_call_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let tool = reg.get("echo").unwrap();
        assert_eq!(tool.call("hello").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn registry_call_failing_tool_is_retryable_check() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        let tool = reg.get("fail").unwrap();
        let err = tool.call("").await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn names_lists_all_registered_tools() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(FailTool));
        let mut names = reg.names();
        names.sort();
        assert_eq!(names, vec!["echo", "fail"]);
    }
}
