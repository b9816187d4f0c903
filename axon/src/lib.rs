#![deny(missing_docs)]
//! # axon — composition root for the tutoring agent's orchestration core
//!
//! Wires the workspace's crates into one running system: the [`Engine`]
//! owns the Orchestrator's collaborators (models, tool registry, sub-agent
//! runner), drives one user turn end to end via `axon_orch::run_turn`, and
//! streams progress through whatever [`axon_core::EventSink`] the caller
//! supplies. The `cli` feature additionally builds `src/main.rs`'s minimal
//! `axum` SSE server.
//!
//! ## Modules
//!
//! | Module | What it holds |
//! |--------|----------------|
//! | [`config`] | [`config::Config`], the full spec §6 configuration surface |
//! | [`wiring`] | Builds `ChatModel`/`VectorStore`/`GraphStore`/tool collaborators from a `Config` |
//! | [`sink`] | [`sink::ChannelSink`], a channel-backed `EventSink` for the SSE transport |
//! | [`engine`] | [`Engine`], the assembled system and its `ask` entry point |

pub mod config;
pub mod engine;
pub mod sink;
pub mod wiring;

pub use config::Config;
pub use engine::{Engine, EngineError};
pub use sink::ChannelSink;
