//! # axon-core — shared types for the tutoring agent's orchestration core
//!
//! This crate defines the types and traits every other `axon-*` crate
//! builds on: typed ids, the turn message log, per-turn state, the
//! `VectorStore`/`GraphStore` collaborator traits, the hook system, the
//! streaming event schema, and sub-task dispatch.
//!
//! ## Modules
//!
//! | Module | What it holds |
//! |--------|----------------|
//! | [`id`] | Typed id newtypes (`SessionId`, `SubTaskId`, ...) |
//! | [`message`] | The turn's heterogeneous message log |
//! | [`turn`] | `TurnState`, `PlanItem`, `ToolCallEvent` |
//! | [`store`] | `VectorStore` and `GraphStore` traits |
//! | [`state`] | `StateStore`/`StateReader` session and profile persistence |
//! | [`dispatch`] | Concurrent sub-task fan-out |
//! | [`hook`] | Observation/intervention at lifecycle points |
//! | [`stream`] | The SSE event schema and `EventSink` |
//! | [`error`] | Error types shared across the workspace |
//!
//! ## Design Principle
//!
//! Every trait here is operation-defined, not mechanism-defined:
//! [`store::VectorStore::query`] means "find similar records" — not "call
//! this specific vector database's API." Swapping the backing index or
//! graph database never touches the orchestrator.

#![deny(missing_docs)]

pub mod dispatch;
pub mod duration;
pub mod error;
pub mod hook;
pub mod id;
pub mod message;
pub mod state;
pub mod store;
pub mod stream;
pub mod turn;

pub use dispatch::{dispatch_many, SubTask, SubTaskRunner};
pub use duration::DurationMs;
pub use error::{HookError, OrchError, StateError, StoreError};
pub use hook::{Hook, HookAction, HookContext, HookPoint};
pub use id::{ChunkId, EntityId, SessionId, SubTaskId, ToolCallId, UserId};
pub use message::{Message, ToolCallRef, INTERNAL_PREFIXES};
pub use state::{SearchResult, StateReader, StateScope, StateStore};
pub use store::{GraphEdge, GraphNode, GraphRow, GraphStore, VectorHit, VectorRecord, VectorStore};
pub use stream::{CustomEvent, EventSink, Phase, Scope, StreamEvent, WireToolCall, WireUserMessage};
pub use turn::{PlanItem, TaskStatus, ToolCallEvent, ToolCallStatus, TurnState};
