//! [`ChatModel`] — the collaborator trait behind Planner, Judge, Responder,
//! and sub-agent model calls (spec §6 `ChatModel`).
//!
//! The teacher's `Provider` trait uses RPITIT and is deliberately not
//! object-safe, because the teacher always has a single generic
//! `NeuronTurn<P: Provider>`. This core instead resolves a *different*
//! model per role at runtime from config (`reasoning`, `fast`, `embedding`),
//! so the trait is redefined with `#[async_trait]` to stay object-safe —
//! `Arc<dyn ChatModel>` is what the orchestrator and sub-agent runner
//! actually hold.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::types::{ProviderRequest, ProviderResponse};

/// Errors from LLM providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// Could not parse the provider's response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call exceeded its timeout (spec §5, default 600s).
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::RequestFailed(_) | ProviderError::Timeout(_)
        )
    }
}

/// Which logical channel a streamed delta belongs to (spec §6 `ChatModel::stream`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaScope {
    /// User-facing output text.
    Content,
    /// Hidden chain-of-thought text, if the model exposes one.
    Reasoning,
}

/// One incremental fragment from a streaming call.
#[derive(Debug, Clone)]
pub struct StreamDelta {
    /// Which channel this fragment belongs to.
    pub scope: DeltaScope,
    /// The text fragment.
    pub text: String,
}

/// A boxed, pinned stream of incremental deltas, terminated by the first
/// `Err` or by exhaustion.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, ProviderError>> + Send>>;

/// LLM chat-completion backend, implemented per-provider
/// (`axon-provider-anthropic`, `-openai`, `-ollama`).
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Non-streaming completion. Returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Streaming completion. Yields content/reasoning deltas in order as the
    /// provider produces them; the stream ends once the provider's response
    /// is fully delivered.
    ///
    /// A provider whose backing model doesn't expose a reasoning channel
    /// simply never yields `DeltaScope::Reasoning` items — callers must not
    /// assume both channels appear.
    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, ProviderError>;

    /// Model identifier this instance targets, for logging/cost attribution.
    fn model_name(&self) -> &str;
}
