#![deny(missing_docs)]
//! Textual Thought/Action/Observation/Final Answer sub-agent runner:
//! executes one sub-task to completion by looping a model call
//! through a strict line-start grammar, dispatching parsed tool calls
//! against an [`axon_tool::ToolRegistry`] and observing lifecycle hooks via
//! [`axon_hooks::HookRegistry`].
//!
//! Implements [`axon_core::SubTaskRunner`], so an [`SubAgentRunner`] plugs
//! directly into `axon-orch`'s `execute` node and its concurrency cap.

mod parser;
mod runner;

pub use parser::{parse_step, ParsedStep};
pub use runner::{SubAgentConfig, SubAgentRunner};
