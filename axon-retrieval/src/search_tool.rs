//! `search_chunks` — the semantic chunk search tool surface.

use std::sync::Arc;

use async_trait::async_trait;

use axon_core::store::VectorStore;
use axon_tool::registry::{ToolDyn, ToolError};

/// Wraps a [`VectorStore`] behind the sub-agent's textual tool surface.
/// `Action Input` is the literal query text; `top_k` is fixed per instance
/// rather than parsed out of the input line, since the protocol only
/// passes a single string.
pub struct SemanticSearchTool {
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl SemanticSearchTool {
    /// Build the tool over `store`, returning up to `top_k` hits per call.
    pub fn new(store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self { store, top_k: top_k.max(1) }
    }

    fn format_hits(hits: &[axon_core::store::VectorHit]) -> String {
        if hits.is_empty() {
            return "No matching chunks found.".to_string();
        }
        hits.iter()
            .enumerate()
            .map(|(i, hit)| {
                let doc_id = hit.metadata.get("doc_id").and_then(|v| v.as_str()).unwrap_or("");
                format!(
                    "{}. [id={}{}] (score={:.4}): {}",
                    i + 1,
                    hit.id,
                    if doc_id.is_empty() { String::new() } else { format!(", doc_id={doc_id}") },
                    hit.score,
                    hit.content.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl ToolDyn for SemanticSearchTool {
    fn name(&self) -> &str {
        "search_chunks"
    }

    fn description(&self) -> &str {
        "Semantic search over indexed text chunks. Input: a natural-language query. \
         Returns the most relevant chunks ranked by similarity, with acronym/keyword matches boosted."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("query text must not be empty".into()));
        }
        let hits = self
            .store
            .query(query, self.top_k)
            .await
            .map_err(|e| if e.is_retryable() { ToolError::Transient(e.to_string()) } else { ToolError::ExecutionFailed(e.to_string()) })?;
        Ok(Self::format_hits(&hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{HashingEmbedder, InMemoryVectorStore};
    use axon_core::store::VectorRecord;
    use std::collections::HashMap;

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(Arc::new(HashingEmbedder::default())));
        let tool = SemanticSearchTool::new(store, 3);
        assert!(matches!(tool.call("   ").await, Err(ToolError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn formats_hits_with_doc_id() {
        let store = InMemoryVectorStore::new(Arc::new(HashingEmbedder::default()));
        let mut metadata = HashMap::new();
        metadata.insert("doc_id".to_string(), serde_json::json!("doc-1"));
        store
            .upsert(vec![VectorRecord { id: "c1".into(), content: "binary search halves the range each step".into(), metadata }])
            .await
            .unwrap();
        let tool = SemanticSearchTool::new(Arc::new(store), 3);
        let out = tool.call("binary search").await.unwrap();
        assert!(out.contains("doc_id=doc-1"));
        assert!(out.contains("binary search halves"));
    }

    #[tokio::test]
    async fn no_hits_reports_clearly() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(Arc::new(HashingEmbedder::default())));
        let tool = SemanticSearchTool::new(store, 3);
        let out = tool.call("anything").await.unwrap();
        assert_eq!(out, "No matching chunks found.");
    }
}
