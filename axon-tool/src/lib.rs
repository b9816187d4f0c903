#![deny(missing_docs)]
//! Tool trait, registry, and middleware for the sub-agent's tool surface.
//!
//! Generalized from the teacher's `ToolDyn`/`ToolRegistry`/`ToolMiddleware`
//! from a JSON-schema, provider-native tool-calling surface to the spec's
//! textual one: each tool is "a named capability callable by the sub-agent
//! with a single-line text argument" (spec Glossary) returning formatted
//! text, not structured JSON.

pub mod middleware;
pub mod registry;

pub use middleware::{
    run_chain, tool_middleware_fn, LoggingMiddleware, Next, RetryMiddleware, TimeoutMiddleware, ToolCall,
    ToolContext, ToolMiddleware,
};
pub use registry::{ToolDyn, ToolError, ToolRegistry};
