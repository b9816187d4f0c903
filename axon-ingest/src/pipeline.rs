//! End-to-end ingestion: chunk → extract → cross-chunk merge → two-layer
//! dedup → relation remap → store writers (spec §4.7, §5 "Ingestion
//! issues per-chunk extraction calls ... per-file pipelines").

use std::collections::HashMap as StdHashMap;
use std::sync::Arc;

use axon_core::store::{GraphEdge, GraphNode, GraphStore, VectorRecord, VectorStore};
use axon_core::error::StoreError;
use axon_turn::ChatModel;
use tokio::sync::Semaphore;

use crate::chunker::chunk_text;
use crate::dedup::{dedup_layer1, dedup_layer2, NameMap};
use crate::error::IngestError;
use crate::extractor::extract_chunks;
use crate::merge::merge_cross_chunk;
use crate::remap::remap_relations;
use crate::types::{Entity, Relation};

/// Knobs for one ingestion run (spec §6 configuration surface:
/// `chunk_size`, `chunk_overlap`, `llm_concurrency`, `file_concurrency`).
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Token-window size passed to the chunker.
    pub chunk_size: usize,
    /// Token overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Per-chunk extraction-call concurrency cap (spec §5 default ≈50).
    pub llm_concurrency: usize,
    /// Per-file pipeline concurrency cap (spec §5 default ≈25).
    pub file_concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 64, llm_concurrency: 50, file_concurrency: 25 }
    }
}

/// The two model roles the ingestion pipeline drives: one call per chunk
/// for extraction, one call per document for the layer-2 consolidation
/// pass. Both may point at the same underlying model.
#[derive(Clone)]
pub struct IngestModels {
    /// Backs [`crate::extractor::extract_chunk`].
    pub extractor: Arc<dyn ChatModel>,
    /// Backs [`crate::dedup::dedup_layer2`].
    pub dedup: Arc<dyn ChatModel>,
}

/// Counts from one completed ingestion run, for logging/telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Chunks written to the vector store.
    pub chunks: usize,
    /// Entities written to the graph store after both dedup layers.
    pub entities: usize,
    /// Relations written to the graph store after remap.
    pub relations: usize,
}

/// Run the full pipeline for one document and persist the result to both
/// stores. Each stage's output feeds the next; a single model call per
/// chunk (bounded by `config.llm_concurrency`) and one model call for
/// layer-2 dedup.
pub async fn ingest_document(
    text: &str,
    doc_id: &str,
    config: &IngestConfig,
    models: &IngestModels,
    vector_store: &dyn VectorStore,
    graph_store: &dyn GraphStore,
) -> Result<IngestSummary, IngestError> {
    let chunks = chunk_text(text, doc_id, config.chunk_size, config.chunk_overlap)?;

    let extractions = extract_chunks(Arc::clone(&models.extractor), chunks.clone(), config.llm_concurrency).await;
    let raw_entities: Vec<Entity> = extractions.iter().flat_map(|r| r.entities.clone()).collect();
    let raw_relations: Vec<Relation> = extractions.iter().flat_map(|r| r.relations.clone()).collect();

    let merged = merge_cross_chunk(raw_entities);
    let (layer1_entities, name_map1) = dedup_layer1(merged);
    let (layer2_entities, name_map2) = dedup_layer2(models.dedup.as_ref(), layer1_entities).await?;

    let mut combined_name_map: NameMap = name_map1;
    combined_name_map.extend(name_map2);

    let final_names: std::collections::HashSet<&str> = layer2_entities.iter().map(|e| e.name.as_str()).collect();
    let relations = remap_relations(raw_relations, &combined_name_map)
        .into_iter()
        .filter(|r| final_names.contains(r.source.as_str()) && final_names.contains(r.target.as_str()))
        .collect::<Vec<_>>();

    let records: Vec<VectorRecord> = chunks
        .iter()
        .map(|c| {
            let mut metadata = StdHashMap::new();
            metadata.insert("doc_id".to_string(), serde_json::json!(c.doc_id));
            VectorRecord { id: c.id.to_string(), content: c.text.clone(), metadata }
        })
        .collect();
    let chunk_count = records.len();
    vector_store.upsert(records).await.map_err(map_store_error)?;

    let mut id_by_name: StdHashMap<&str, String> = StdHashMap::new();
    for entity in &layer2_entities {
        id_by_name.insert(entity.name.as_str(), entity.id.to_string());
        graph_store
            .upsert_node(GraphNode {
                entity_id: entity.id.to_string(),
                name: entity.name.clone(),
                node_type: entity_type_label(entity),
                description: entity.description.clone(),
                aliases: entity.aliases.clone(),
            })
            .await
            .map_err(map_store_error)?;
    }
    for relation in &relations {
        let (Some(source), Some(target)) = (id_by_name.get(relation.source.as_str()), id_by_name.get(relation.target.as_str())) else {
            continue;
        };
        graph_store
            .upsert_edge(GraphEdge {
                source: source.clone(),
                target: target.clone(),
                edge_type: relation_type_label(relation),
                original_type: None,
                description: relation.description.clone(),
                weight: relation.weight,
            })
            .await
            .map_err(map_store_error)?;
    }

    Ok(IngestSummary { chunks: chunk_count, entities: layer2_entities.len(), relations: relations.len() })
}

fn entity_type_label(entity: &Entity) -> String {
    serde_json::to_value(entity.entity_type).ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default()
}

fn relation_type_label(relation: &Relation) -> String {
    serde_json::to_value(relation.relation_type).ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default()
}

fn map_store_error(err: StoreError) -> IngestError {
    IngestError::Other(Box::new(err))
}

/// One document to ingest, paired with its id.
pub struct IngestDocument {
    /// The document's id, used to derive stable chunk ids.
    pub doc_id: String,
    /// The document's raw text.
    pub text: String,
}

/// Run [`ingest_document`] over every document concurrently, bounded by
/// `config.file_concurrency` (spec §5 "per-file pipelines under a
/// file-concurrency semaphore"). A document whose pipeline fails is logged
/// and excluded from the returned summaries rather than aborting the rest.
pub async fn ingest_documents(
    documents: Vec<IngestDocument>,
    config: Arc<IngestConfig>,
    models: Arc<IngestModels>,
    vector_store: Arc<dyn VectorStore>,
    graph_store: Arc<dyn GraphStore>,
) -> Vec<IngestSummary> {
    let semaphore = Arc::new(Semaphore::new(config.file_concurrency.max(1)));
    let mut handles = Vec::with_capacity(documents.len());

    for doc in documents {
        let semaphore = Arc::clone(&semaphore);
        let config = Arc::clone(&config);
        let models = Arc::clone(&models);
        let vector_store = Arc::clone(&vector_store);
        let graph_store = Arc::clone(&graph_store);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore is never closed while handles are outstanding");
            ingest_document(&doc.text, &doc.doc_id, &config, &models, vector_store.as_ref(), graph_store.as_ref()).await
        }));
    }

    let mut summaries = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(err)) => tracing::warn!(error = %err, "document ingestion failed, skipping"),
            Err(join_err) => tracing::warn!(error = %join_err, "document ingestion task panicked, skipping"),
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axon_retrieval::graph::InMemoryGraphStore;
    use axon_retrieval::vector::{HashingEmbedder, InMemoryVectorStore};
    use axon_turn::{ContentPart, DeltaStream, ProviderError, ProviderRequest, ProviderResponse, Role, StopReason, TokenUsage};
    use tokio::sync::Mutex;

    struct ScriptedModel {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<&str>) -> Self {
            Self { replies: Mutex::new(replies.into_iter().map(String::from).rev().collect()) }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let text = self.replies.lock().await.pop().unwrap_or_default();
            Ok(ProviderResponse {
                content: vec![ContentPart::Text { text }],
                reasoning: None,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
                model: "scripted".into(),
                cost: None,
                truncated: None,
            })
        }
        async fn stream(&self, _request: ProviderRequest) -> Result<DeltaStream, ProviderError> {
            unimplemented!("ingestion only uses complete()")
        }
        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn end_to_end_ingest_writes_chunks_entities_and_relations() {
        let extraction = r#"{"entities":[{"name":"BFS","type":"Algorithm","description":"traversal"},
            {"name":"Queue","type":"DataStructure","description":"FIFO"}],
            "relations":[{"source":"BFS","target":"Queue","type":"USES"}]}"#;
        let models = IngestModels {
            extractor: Arc::new(ScriptedModel::new(vec![extraction])),
            dedup: Arc::new(ScriptedModel::new(vec!["[]"])),
        };
        let vector_store = InMemoryVectorStore::new(Arc::new(HashingEmbedder::default()));
        let graph_store = InMemoryGraphStore::new();
        let config = IngestConfig { chunk_size: 50, chunk_overlap: 0, llm_concurrency: 4, file_concurrency: 4 };

        let summary = ingest_document("BFS uses a queue to explore nodes.", "doc-1", &config, &models, &vector_store, &graph_store)
            .await
            .unwrap();

        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.entities, 2);
        assert_eq!(summary.relations, 1);
        assert!(graph_store.has_node(&crate::types::entity_id_for("BFS").to_string()).await.unwrap());
    }
}
