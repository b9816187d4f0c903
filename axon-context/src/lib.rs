#![deny(missing_docs)]
//! Dialogue-history rendering and context compaction for the orchestration
//! core.
//!
//! Two distinct concerns live here, both generalized from the teacher's
//! `ContextStrategy` trait ("compact a message window" for long-running
//! sub-agent conversations):
//!
//! - [`history`] renders a bounded, labeled-untrusted view of prior turns
//!   for the Planner (spec §4.2) — this is pure string rendering, not
//!   compaction.
//! - [`strategies`] holds the generalized `ContextStrategy` trait and its
//!   implementations, used to keep a sub-agent's own ReAct conversation
//!   within budget across many steps.

pub mod counter;
pub mod history;
pub mod strategies;

pub use counter::TokenCounter;
pub use history::render_history;
pub use strategies::{
    CompositeStrategy, ContextStrategy, NoCompaction, PersistentStrategy, SlidingWindowStrategy,
    SummarizationStrategy, ToolResultClearingStrategy,
};
