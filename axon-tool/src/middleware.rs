//! Middleware pipeline around tool execution.
//!
//! The shape is the teacher's: "like axum's `from_fn`" — each middleware
//! receives a [`Next`] it can call to continue the chain, or short-circuit
//! by returning without calling it. Re-expressed with `#[async_trait]`
//! instead of hand-rolled boxed futures, since this core has no WASM target
//! to keep dependency-free.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::registry::{ToolDyn, ToolError};

/// A tool call in flight through the middleware pipeline.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// The tool-call id assigned by the sub-agent runner.
    pub id: String,
    /// Name of the tool being called.
    pub name: String,
    /// The literal `Action Input` string.
    pub input: String,
}

/// Context carried alongside a tool call, for logging/attribution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The sub-task this call belongs to, if known.
    pub sub_task_id: Option<String>,
}

/// Middleware wrapping tool execution: inspect/modify the call before
/// dispatch, short-circuit, or inspect/modify the result after.
#[async_trait]
pub trait ToolMiddleware: Send + Sync {
    /// Process one call, delegating to `next` to continue the chain.
    async fn process(&self, call: &ToolCall, ctx: &ToolContext, next: Next<'_>) -> Result<String, ToolError>;
}

/// The remaining middleware chain plus the underlying tool. Consumed on
/// `run` to prevent double invocation.
pub struct Next<'a> {
    tool: &'a dyn ToolDyn,
    middleware: &'a [Arc<dyn ToolMiddleware>],
}

impl<'a> Next<'a> {
    /// Construct from a tool and the remaining middleware slice.
    pub fn new(tool: &'a dyn ToolDyn, middleware: &'a [Arc<dyn ToolMiddleware>]) -> Self {
        Self { tool, middleware }
    }

    /// Continue the chain, eventually calling the tool itself.
    pub async fn run(self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        if let Some((head, tail)) = self.middleware.split_first() {
            let next = Next::new(self.tool, tail);
            head.process(call, ctx, next).await
        } else {
            self.tool.call(&call.input).await
        }
    }
}

/// Run `call` through `middleware` against `tool`.
pub async fn run_chain(
    tool: &dyn ToolDyn,
    middleware: &[Arc<dyn ToolMiddleware>],
    call: &ToolCall,
    ctx: &ToolContext,
) -> Result<String, ToolError> {
    Next::new(tool, middleware).run(call, ctx).await
}

/// Closure-based middleware constructor, mirroring axum's `from_fn`.
pub fn tool_middleware_fn<F, Fut>(f: F) -> impl ToolMiddleware
where
    F: for<'a> Fn(&'a ToolCall, &'a ToolContext, Next<'a>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<String, ToolError>> + Send,
{
    struct MiddlewareFn<F>(F);

    #[async_trait]
    impl<F, Fut> ToolMiddleware for MiddlewareFn<F>
    where
        F: for<'a> Fn(&'a ToolCall, &'a ToolContext, Next<'a>) -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<String, ToolError>> + Send,
    {
        async fn process(&self, call: &ToolCall, ctx: &ToolContext, next: Next<'_>) -> Result<String, ToolError> {
            (self.0)(call, ctx, next).await
        }
    }

    MiddlewareFn(f)
}

/// Logs tool entry/exit at `info` level, matching the teacher's
/// `tracing::instrument` convention on orchestrator/provider calls.
pub struct LoggingMiddleware;

#[async_trait]
impl ToolMiddleware for LoggingMiddleware {
    async fn process(&self, call: &ToolCall, ctx: &ToolContext, next: Next<'_>) -> Result<String, ToolError> {
        info!(tool = %call.name, sub_task_id = ?ctx.sub_task_id, "tool call started");
        let result = next.run(call, ctx).await;
        match &result {
            Ok(_) => info!(tool = %call.name, "tool call completed"),
            Err(err) => warn!(tool = %call.name, error = %err, "tool call failed"),
        }
        result
    }
}

/// Bounds tool execution to a timeout, converting an expiry into a
/// [`ToolError::Transient`] (retryable).
pub struct TimeoutMiddleware {
    /// Maximum time to allow the inner chain to run.
    pub timeout: Duration,
}

#[async_trait]
impl ToolMiddleware for TimeoutMiddleware {
    async fn process(&self, call: &ToolCall, ctx: &ToolContext, next: Next<'_>) -> Result<String, ToolError> {
        match tokio::time::timeout(self.timeout, next.run(call, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Transient(format!(
                "tool '{}' timed out after {:?}",
                call.name, self.timeout
            ))),
        }
    }
}

/// Retries a transient failure with exponential backoff, up to `max_attempts`
/// total tries (spec §5/§7: transient store errors retry "exponential
/// backoff, max 3 attempts").
pub struct RetryMiddleware {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay; attempt `n` (0-indexed) waits `base * 2^n`.
    pub base_delay: Duration,
}

impl RetryMiddleware {
    /// Construct with the spec default of 3 max attempts.
    pub fn new(base_delay: Duration) -> Self {
        Self {
            max_attempts: 3,
            base_delay,
        }
    }
}

#[async_trait]
impl ToolMiddleware for RetryMiddleware {
    async fn process(&self, call: &ToolCall, ctx: &ToolContext, next: Next<'_>) -> Result<String, ToolError> {
        // `next` is consumed by its first `run`; retries re-dispatch through
        // a fresh `Next` built from the same tool/middleware slice instead.
        let mut attempt = 0;
        loop {
            attempt += 1;
            let tool = next.tool;
            let middleware = next.middleware;
            let result = Next::new(tool, middleware).run(call, ctx).await;
            match result {
                Ok(ok) => return Ok(ok),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.pow(attempt - 1);
                    warn!(tool = %call.name, attempt, "transient tool error, retrying after {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
