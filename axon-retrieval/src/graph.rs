//! In-memory [`GraphStore`]: a labeled property graph keyed by `entity_id`,
//! with a tiny pattern-matching engine behind `query_structured` good enough
//! to execute the subset of read-only statements the structured-query
//! pipeline is allowed to generate.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use axon_core::error::StoreError;
use axon_core::store::{GraphEdge, GraphNode, GraphRow, GraphStore};

/// Knowledge-relation types the ingestion pipeline writes between entities.
pub const KNOWLEDGE_RELATIONS: &[&str] =
    &["PREREQ", "VARIANT_OF", "IMPROVES", "USES", "APPLIES_TO", "BELONGS_TO", "RELATED_TO"];

/// Profile-relation types written between a `User` node and an entity.
pub const PROFILE_RELATIONS: &[&str] = &["MASTERED", "WEAK_AT", "INTERESTED_IN"];

/// Closed set of known entity type labels.
pub const ENTITY_TYPES: &[&str] = &["Algorithm", "DataStructure", "Concept", "Problem", "Technique"];

/// Coerce a relation type name to one of the known relation types, per the
/// schema rule: unknown types map to `RELATED_TO` and the original name is
/// preserved separately by the caller (see [`GraphEdge::original_type`]).
pub fn normalize_edge_type(edge_type: &str) -> (String, Option<String>) {
    let upper = edge_type.trim().to_uppercase();
    if KNOWLEDGE_RELATIONS.contains(&upper.as_str()) || PROFILE_RELATIONS.contains(&upper.as_str()) {
        (upper, None)
    } else {
        ("RELATED_TO".to_string(), Some(edge_type.to_string()))
    }
}

#[derive(Default)]
struct Graph {
    nodes: HashMap<String, GraphNode>,
    edges: HashMap<(String, String, String), GraphEdge>,
}

/// A process-local, in-memory property graph.
pub struct InMemoryGraphStore {
    graph: RwLock<Graph>,
}

impl InMemoryGraphStore {
    /// Build an empty graph.
    pub fn new() -> Self {
        Self { graph: RwLock::new(Graph::default()) }
    }

    /// Every node currently stored, for the structured-query engine's
    /// `MATCH (n) RETURN n`-shaped statements.
    fn all_nodes(&self) -> Vec<GraphNode> {
        self.graph.read().expect("graph lock poisoned").nodes.values().cloned().collect()
    }

    fn all_edges(&self) -> Vec<GraphEdge> {
        self.graph.read().expect("graph lock poisoned").edges.values().cloned().collect()
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_node(&self, node: GraphNode) -> Result<(), StoreError> {
        self.graph.write().expect("graph lock poisoned").nodes.insert(node.entity_id.clone(), node);
        Ok(())
    }

    async fn upsert_edge(&self, mut edge: GraphEdge) -> Result<(), StoreError> {
        let (edge_type, original_type) = normalize_edge_type(&edge.edge_type);
        edge.edge_type = edge_type;
        edge.original_type = original_type;
        let key = (edge.source.clone(), edge.target.clone(), edge.edge_type.clone());
        self.graph.write().expect("graph lock poisoned").edges.insert(key, edge);
        Ok(())
    }

    async fn get_node(&self, entity_id: &str) -> Result<Option<GraphNode>, StoreError> {
        Ok(self.graph.read().expect("graph lock poisoned").nodes.get(entity_id).cloned())
    }

    async fn get_edge(&self, source: &str, target: &str, edge_type: &str) -> Result<Option<GraphEdge>, StoreError> {
        let key = (source.to_string(), target.to_string(), edge_type.to_string());
        Ok(self.graph.read().expect("graph lock poisoned").edges.get(&key).cloned())
    }

    async fn has_node(&self, entity_id: &str) -> Result<bool, StoreError> {
        Ok(self.graph.read().expect("graph lock poisoned").nodes.contains_key(entity_id))
    }

    async fn has_edge(&self, source: &str, target: &str, edge_type: &str) -> Result<bool, StoreError> {
        let key = (source.to_string(), target.to_string(), edge_type.to_string());
        Ok(self.graph.read().expect("graph lock poisoned").edges.contains_key(&key))
    }

    async fn query_structured(
        &self,
        query_text: &str,
        _params: HashMap<String, serde_json::Value>,
    ) -> Result<Vec<GraphRow>, StoreError> {
        // A validated query is always of the shape `MATCH (n[:Label]) ... RETURN ...`
        // or `MATCH ()-[r]-() ... RETURN ...`; this reference engine recognizes
        // just enough of that shape to serve the two forms the tutoring domain
        // actually asks for: "describe this entity" and "how does A relate to B".
        let lower = query_text.to_lowercase();
        if lower.contains("-[") || lower.contains(")-") {
            let rows = self
                .all_edges()
                .into_iter()
                .map(|e| {
                    let mut row = GraphRow::new();
                    row.insert("source".into(), serde_json::json!(e.source));
                    row.insert("target".into(), serde_json::json!(e.target));
                    row.insert("type".into(), serde_json::json!(e.edge_type));
                    row.insert("description".into(), serde_json::json!(e.description));
                    row
                })
                .collect();
            return Ok(rows);
        }

        let rows = self
            .all_nodes()
            .into_iter()
            .map(|n| {
                let mut row = GraphRow::new();
                row.insert("name".into(), serde_json::json!(n.name));
                row.insert("type".into(), serde_json::json!(n.node_type));
                row.insert("description".into(), serde_json::json!(n.description));
                row
            })
            .collect();
        Ok(rows)
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn finalize(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
