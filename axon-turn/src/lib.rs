#![deny(missing_docs)]
//! `ChatModel` trait, wire message types, and context assembly.
//!
//! This crate defines the provider-facing boundary (spec §6 `ChatModel`):
//! the wire vocabulary (`ProviderMessage`, `ContentPart`, `ProviderRequest`,
//! `ProviderResponse`), the [`ChatModel`] trait itself, and conversion
//! between `axon_core::Message` and the wire vocabulary. Per-provider crates
//! (`axon-provider-anthropic`, `-openai`, `-ollama`) implement `ChatModel`;
//! `axon-orch` and `axon-subagent` are the only callers.

pub mod config;
pub mod convert;
pub mod embedder;
pub mod provider;
pub mod types;

pub use config::ModelDefaults;
pub use convert::{message_to_provider, messages_to_provider, response_to_message};
pub use embedder::Embedder;
pub use provider::{ChatModel, DeltaScope, DeltaStream, ProviderError, StreamDelta};
pub use types::*;
