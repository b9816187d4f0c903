//! `VectorStore` and `GraphStore` — the two retrieval collaborators.
//!
//! Generalized from the same `read`/`write`/`search` shape the teacher uses
//! for session state: async-trait, `Send + Sync`, one `#[non_exhaustive]`
//! error type per store family.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::StoreError;

/// One row returned by a vector similarity query.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorHit {
    /// The stored record's id.
    pub id: String,
    /// Cosine similarity against the query embedding.
    pub score: f32,
    /// The record's stored text.
    pub content: String,
    /// Free-form metadata, e.g. `doc_id`, `keyword_score`.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A record to upsert into a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Record id.
    pub id: String,
    /// Text content; the store embeds it if no vector is supplied.
    pub content: String,
    /// Free-form metadata preserved on the stored record.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A pre-normalized text-chunk index with cosine similarity search.
///
/// Collaborator behind the semantic chunk search tool (spec §4.4). Backed
/// in this workspace by `axon-retrieval::vector::InMemoryVectorStore`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed `query_text` and return the `top_k` nearest records by cosine
    /// similarity.
    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<VectorHit>, StoreError>;

    /// Insert or overwrite the given records, embedding any that lack a
    /// precomputed vector.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError>;

    /// Remove records by id. No-op for ids that don't exist.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Open/prepare any underlying resources. Idempotent.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Flush and release any underlying resources.
    async fn finalize(&self) -> Result<(), StoreError>;
}

/// One node in the property graph.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Unique entity or user identifier.
    pub entity_id: String,
    /// Display name.
    pub name: String,
    /// One of the closed entity types, or `"User"`.
    pub node_type: String,
    /// Free-text description.
    pub description: String,
    /// Known aliases.
    pub aliases: Vec<String>,
}

/// One relationship edge in the property graph.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship type. Unknown types are written as `RELATED_TO` with
    /// the original name preserved in `original_type`.
    pub edge_type: String,
    /// The original relation name, if `edge_type` was coerced to
    /// `RELATED_TO`.
    pub original_type: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Edge weight, default 1.0.
    pub weight: f32,
}

/// One row of a structured-query result.
pub type GraphRow = HashMap<String, serde_json::Value>;

/// A labeled property graph, queried both by direct node/edge operations
/// and by the structured-query surface (spec §4.5/§6).
///
/// Backed in this workspace by `axon-retrieval::graph_query`'s in-memory
/// adapter; `query_structured` on a real backend assumes the safety layer
/// in `axon-retrieval::graph_query` has already validated `query_text`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create or overwrite a node, keyed by `entity_id`.
    async fn upsert_node(&self, node: GraphNode) -> Result<(), StoreError>;

    /// Create or overwrite an edge.
    async fn upsert_edge(&self, edge: GraphEdge) -> Result<(), StoreError>;

    /// Look up a node by id.
    async fn get_node(&self, entity_id: &str) -> Result<Option<GraphNode>, StoreError>;

    /// Look up an edge by its endpoints and type.
    async fn get_edge(
        &self,
        source: &str,
        target: &str,
        edge_type: &str,
    ) -> Result<Option<GraphEdge>, StoreError>;

    /// Whether a node with this id exists.
    async fn has_node(&self, entity_id: &str) -> Result<bool, StoreError>;

    /// Whether an edge with these endpoints and type exists.
    async fn has_edge(&self, source: &str, target: &str, edge_type: &str) -> Result<bool, StoreError>;

    /// Execute a validated, read-only structured query and return its rows.
    async fn query_structured(
        &self,
        query_text: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<Vec<GraphRow>, StoreError>;

    /// Create unique constraints on `entity_id`/`user_id` and any other
    /// idempotent schema setup. Safe to call repeatedly.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Flush and release any underlying resources.
    async fn finalize(&self) -> Result<(), StoreError>;
}
