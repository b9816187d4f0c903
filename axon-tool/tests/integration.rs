use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axon_tool::{run_chain, LoggingMiddleware, RetryMiddleware, ToolCall, ToolContext, ToolDyn, ToolError, ToolRegistry};

struct UppercaseTool;

#[async_trait]
impl ToolDyn for UppercaseTool {
    fn name(&self) -> &str {
        "uppercase"
    }

    fn description(&self) -> &str {
        "Uppercases the input string"
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        if input.is_empty() {
            return Err(ToolError::InvalidInput("input must not be empty".into()));
        }
        Ok(input.to_uppercase())
    }
}

#[tokio::test]
async fn registry_lookup_then_middleware_chain_runs_end_to_end() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(UppercaseTool));

    let tool = registry.get("uppercase").expect("tool registered");
    let middleware: Vec<Arc<dyn axon_tool::ToolMiddleware>> = vec![
        Arc::new(LoggingMiddleware),
        Arc::new(RetryMiddleware::new(Duration::from_millis(1))),
    ];
    let call = ToolCall {
        id: "call-1".into(),
        name: "uppercase".into(),
        input: "hello world".into(),
    };

    let result = run_chain(tool.as_ref(), &middleware, &call, &ToolContext::default())
        .await
        .unwrap();
    assert_eq!(result, "HELLO WORLD");
}

#[tokio::test]
async fn unregistered_tool_lookup_returns_none() {
    let registry = ToolRegistry::new();
    assert!(registry.get("does-not-exist").is_none());
}

#[tokio::test]
async fn invalid_input_is_not_retryable() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(UppercaseTool));
    let tool = registry.get("uppercase").unwrap();
    let err = tool.call("").await.unwrap_err();
    assert!(!err.is_retryable());
}
