//! Builds the swappable collaborators (`ChatModel`, `VectorStore`,
//! `GraphStore`, `StateStore`, the tool registry) from a [`Config`], the way
//! the teacher's binary crates wire concrete adapters behind their trait
//! objects at the composition root rather than inside the engine itself.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axon_core::state::StateStore;
use axon_core::store::{GraphStore, VectorStore};
use axon_retrieval::{GraphQueryTool, HashingEmbedder, InMemoryGraphStore, InMemoryVectorStore, SemanticSearchTool, WebSearchTool};
use axon_tool::ToolRegistry;
use axon_turn::{ChatModel, DeltaStream, ProviderError, ProviderRequest, ProviderResponse};
use thiserror::Error;

use crate::config::{Config, ModelRoleConfig};

/// Errors building the collaborator graph from a [`Config`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WiringError {
    /// `role.provider` didn't match a compiled-in provider adapter.
    #[error("unknown or not-compiled-in model provider: {0}")]
    UnknownProvider(String),
}

/// Wraps a provider to pin every request's `model` field to this role's
/// configured model, unless the caller already set one. Providers fall back
/// to their own hardcoded default when `request.model` is `None`
/// (`axon-orch`'s node handlers always build requests with `model: None`),
/// so this is where a [`Config`]'s per-role model selection actually takes
/// effect.
struct RoleBoundModel {
    inner: Arc<dyn ChatModel>,
    model: Option<String>,
}

impl RoleBoundModel {
    fn pin(&self, mut request: ProviderRequest) -> ProviderRequest {
        if request.model.is_none() {
            request.model = self.model.clone();
        }
        request
    }
}

#[async_trait]
impl ChatModel for RoleBoundModel {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.inner.complete(self.pin(request)).await
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, ProviderError> {
        self.inner.stream(self.pin(request)).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Construct a [`ChatModel`] for one role from its provider name, pinned to
/// `role.model` if set.
///
/// Each branch is feature-gated the same way the teacher's `neuron`
/// umbrella crate gates its provider adapters behind Cargo features
/// (`provider-anthropic`, `provider-openai`, `provider-ollama`).
pub fn build_chat_model(role: &ModelRoleConfig) -> Result<Arc<dyn ChatModel>, WiringError> {
    let inner: Arc<dyn ChatModel> = match role.provider.as_str() {
        #[cfg(feature = "provider-anthropic")]
        "anthropic" => Arc::new(axon_provider_anthropic::AnthropicProvider::new(role.api_key.clone().unwrap_or_default())),
        #[cfg(feature = "provider-openai")]
        "openai" => Arc::new(axon_provider_openai::OpenAIProvider::new(role.api_key.clone().unwrap_or_default())),
        #[cfg(feature = "provider-ollama")]
        "ollama" => Arc::new(axon_provider_ollama::OllamaProvider::new()),
        other => return Err(WiringError::UnknownProvider(other.to_string())),
    };

    if role.model.is_empty() {
        return Ok(inner);
    }
    Ok(Arc::new(RoleBoundModel { inner, model: Some(role.model.clone()) }))
}

/// In-memory reference adapters for the vector and graph stores (spec §1
/// "ships in-memory/filesystem reference adapters for each"). Real
/// deployments swap these for a vector database and a property-graph
/// backend without touching the orchestrator.
pub fn build_in_memory_stores() -> (Arc<dyn VectorStore>, Arc<dyn GraphStore>) {
    let embedder = Arc::new(HashingEmbedder::default());
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedder));
    let graph_store: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
    (vector_store, graph_store)
}

/// Build the `StateStore` backend: filesystem-backed when `root` is given
/// and the `state-fs` feature is compiled in, in-memory otherwise.
pub fn build_state_store(#[allow(unused_variables)] root: Option<&Path>) -> Arc<dyn StateStore> {
    #[cfg(feature = "state-fs")]
    if let Some(root) = root {
        return Arc::new(axon_state_fs::FsStore::new(root));
    }
    Arc::new(axon_state_memory::MemoryStore::new())
}

/// Register the three retrieval tools (spec §4.4/§4.5 plus the optional
/// web-search tool) against the given stores and the reasoning model that
/// drives structured-query generation.
pub fn build_tool_registry(
    config: &Config,
    reasoning_model: Arc<dyn ChatModel>,
    vector_store: Arc<dyn VectorStore>,
    graph_store: Arc<dyn GraphStore>,
    web_search: Option<WebSearchConfig>,
) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SemanticSearchTool::new(vector_store, config.top_k)));
    registry.register(Arc::new(GraphQueryTool::new(reasoning_model, graph_store)));
    if let Some(web_search) = web_search {
        registry.register(Arc::new(WebSearchTool::new(web_search.endpoint, web_search.api_key, web_search.max_results)));
    }
    Arc::new(registry)
}

/// Endpoint/credentials for the optional web-search tool (spec §4.4 "Tools:
/// ... optional web search").
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    /// Search API endpoint.
    pub endpoint: String,
    /// API key, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Maximum results to keep.
    pub max_results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let role = ModelRoleConfig { provider: "not-a-provider".into(), model: String::new(), api_key: None };
        let err = build_chat_model(&role).unwrap_err();
        assert!(matches!(err, WiringError::UnknownProvider(p) if p == "not-a-provider"));
    }

    #[test]
    fn in_memory_stores_are_constructible() {
        let (_vector, _graph) = build_in_memory_stores();
    }

    #[test]
    fn state_store_defaults_to_in_memory() {
        let _store = build_state_store(None);
    }
}
