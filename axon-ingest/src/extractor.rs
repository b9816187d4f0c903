//! Entity/relation extraction (spec §4.7 "Extractor"): one model call per
//! chunk, bounded by a shared semaphore, producing this chunk's `Entity`
//! and `Relation` records.

use std::sync::Arc;

use axon_turn::{ChatModel, ContentPart, ProviderMessage, ProviderRequest, Role};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::IngestError;
use crate::types::{Entity, EntityType, Relation, RelationType, TextChunk};

/// One chunk's extraction result, post intra-chunk relation filtering.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Entities found in the chunk.
    pub entities: Vec<Entity>,
    /// Relations whose endpoints both resolved to an entity name extracted
    /// from the same chunk (spec §3 invariant: dangling relations dropped
    /// immediately).
    pub relations: Vec<Relation>,
}

#[derive(Debug, Deserialize, Default)]
struct RawExtraction {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    relations: Vec<RawRelation>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    name: String,
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRelation {
    source: String,
    target: String,
    #[serde(rename = "type")]
    relation_type: String,
    #[serde(default)]
    description: String,
}

fn parse_relation_type(raw: &str) -> RelationType {
    match raw.trim().to_uppercase().as_str() {
        "PREREQ" => RelationType::Prereq,
        "VARIANT_OF" => RelationType::VariantOf,
        "IMPROVES" => RelationType::Improves,
        "USES" => RelationType::Uses,
        "APPLIES_TO" => RelationType::AppliesTo,
        "BELONGS_TO" => RelationType::BelongsTo,
        _ => RelationType::RelatedTo,
    }
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Find the outermost `{` ... `}` span and parse it, tolerating prose
/// wrapped around the JSON object (mirrors the Planner's bracket-extraction
/// leniency in `axon-orch::planner::parse_plan`, but for an object rather
/// than an array).
fn parse_raw(raw: &str) -> Option<RawExtraction> {
    let stripped = strip_fences(raw);
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&stripped[start..=end]).ok()
}

fn build_extraction_request(chunk_text: &str) -> ProviderRequest {
    let system = "You extract algorithms/competitive-programming knowledge from a text chunk. \
         Respond with ONLY a JSON object of the form {\"entities\": [{\"name\", \"type\" (one of \
         Algorithm, DataStructure, Technique, Problem, Concept), \"description\", \"aliases\": []}], \
         \"relations\": [{\"source\", \"target\", \"type\" (one of PREREQ, VARIANT_OF, IMPROVES, USES, \
         APPLIES_TO, BELONGS_TO, RELATED_TO), \"description\"}]}. `source` and `target` must be entity \
         names that appear in `entities`. No prose before or after the JSON."
        .to_string();
    ProviderRequest {
        model: None,
        messages: vec![ProviderMessage { role: Role::User, content: vec![ContentPart::Text { text: chunk_text.to_string() }] }],
        tools: Vec::new(),
        max_tokens: None,
        temperature: None,
        system: Some(system),
        timeout: None,
        extra: Value::Null,
    }
}

async fn call_and_parse(model: &dyn ChatModel, chunk_text: &str) -> Result<RawExtraction, IngestError> {
    let response = model
        .complete(build_extraction_request(chunk_text))
        .await
        .map_err(|e| IngestError::Model(e.to_string()))?;
    let text = response.text();

    if let Some(parsed) = parse_raw(&text) {
        return Ok(parsed);
    }

    // One retry on empty/unparseable output (spec §4.7 "Parse JSON with one
    // retry on empty parse").
    let retry_response = model
        .complete(build_extraction_request(chunk_text))
        .await
        .map_err(|e| IngestError::Model(e.to_string()))?;
    let retry_text = retry_response.text();
    parse_raw(&retry_text).ok_or_else(|| IngestError::UnparseableOutput(retry_text))
}

/// Extract entities and relations from one chunk, dropping any relation
/// whose source or target isn't among this chunk's own extracted entity
/// names (spec §3 invariant).
pub async fn extract_chunk(model: &dyn ChatModel, chunk: &TextChunk) -> Result<ExtractionResult, IngestError> {
    let raw = call_and_parse(model, &chunk.text).await?;

    let entities: Vec<Entity> = raw
        .entities
        .into_iter()
        .filter_map(|e| {
            let entity_type = EntityType::parse(&e.entity_type)?;
            let mut entity = Entity::new(e.name, entity_type, e.description);
            entity.aliases = e.aliases;
            entity.source_chunks = vec![chunk.id.clone()];
            Some(entity)
        })
        .collect();

    let known_names: std::collections::HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    let relations = raw
        .relations
        .into_iter()
        .filter(|r| known_names.contains(r.source.as_str()) && known_names.contains(r.target.as_str()))
        .map(|r| Relation {
            source: r.source,
            target: r.target,
            relation_type: parse_relation_type(&r.relation_type),
            description: r.description,
            weight: 1.0,
        })
        .collect();

    Ok(ExtractionResult { entities, relations })
}

/// Extract every chunk concurrently under `concurrency` permits (spec §5
/// "Ingestion issues per-chunk extraction calls under a separate
/// model-concurrency semaphore"). A chunk whose extraction fails is logged
/// and dropped rather than aborting the whole document — one bad chunk
/// must not block ingesting the rest.
pub async fn extract_chunks(
    model: Arc<dyn ChatModel>,
    chunks: Vec<TextChunk>,
    concurrency: usize,
) -> Vec<ExtractionResult> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let model = Arc::clone(&model);
        let semaphore = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore is never closed while handles are outstanding");
            extract_chunk(model.as_ref(), &chunk).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(err)) => tracing::warn!(error = %err, "chunk extraction failed, dropping chunk"),
            Err(join_err) => tracing::warn!(error = %join_err, "chunk extraction task panicked, dropping chunk"),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axon_turn::{DeltaStream, ProviderError, ProviderResponse, StopReason, TokenUsage};
    use axon_core::ChunkId;
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
            unimplemented!("extractor only uses complete()")
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn sample_chunk() -> TextChunk {
        TextChunk { id: ChunkId::new("c1"), text: "BFS uses a queue.".into(), doc_id: "doc".into(), token_range: (0, 4), metadata: Default::default() }
    }

    #[tokio::test]
    async fn extracts_entities_and_relations_with_known_endpoints() {
        let raw = r#"{"entities":[{"name":"BFS","type":"Algorithm","description":"traversal"},
            {"name":"Queue","type":"DataStructure","description":"FIFO"}],
            "relations":[{"source":"BFS","target":"Queue","type":"USES"}]}"#;
        let model = ScriptedModel::new(vec![raw]);
        let result = extract_chunk(&model, &sample_chunk()).await.unwrap();
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.relations.len(), 1);
        assert_eq!(result.relations[0].relation_type, RelationType::Uses);
    }

    #[tokio::test]
    async fn drops_relations_with_dangling_endpoints() {
        let raw = r#"{"entities":[{"name":"BFS","type":"Algorithm","description":""}],
            "relations":[{"source":"BFS","target":"NotExtracted","type":"USES"}]}"#;
        let model = ScriptedModel::new(vec![raw]);
        let result = extract_chunk(&model, &sample_chunk()).await.unwrap();
        assert_eq!(result.entities.len(), 1);
        assert!(result.relations.is_empty());
    }

    #[tokio::test]
    async fn retries_once_on_unparseable_output_then_succeeds() {
        let good = r#"{"entities":[{"name":"BFS","type":"Algorithm","description":""}],"relations":[]}"#;
        let model = ScriptedModel::new(vec!["not json at all", good]);
        let result = extract_chunk(&model, &sample_chunk()).await.unwrap();
        assert_eq!(result.entities.len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_one_retry() {
        let model = ScriptedModel::new(vec!["nope", "still nope"]);
        let err = extract_chunk(&model, &sample_chunk()).await.unwrap_err();
        assert!(matches!(err, IngestError::UnparseableOutput(_)));
    }

    #[tokio::test]
    async fn ignores_unknown_entity_type() {
        let raw = r#"{"entities":[{"name":"X","type":"NotAType","description":""}],"relations":[]}"#;
        let model = ScriptedModel::new(vec![raw]);
        let result = extract_chunk(&model, &sample_chunk()).await.unwrap();
        assert!(result.entities.is_empty());
    }

    #[tokio::test]
    async fn extracts_many_chunks_concurrently_and_preserves_successes() {
        let raw = r#"{"entities":[{"name":"BFS","type":"Algorithm","description":""}],"relations":[]}"#;
        let model: Arc<dyn ChatModel> = Arc::new(ScriptedModel::new(vec![raw, raw, raw]));
        let chunks = vec![
            TextChunk { id: ChunkId::new("c1"), text: "t1".into(), doc_id: "d".into(), token_range: (0, 1), metadata: Default::default() },
            TextChunk { id: ChunkId::new("c2"), text: "t2".into(), doc_id: "d".into(), token_range: (1, 2), metadata: Default::default() },
            TextChunk { id: ChunkId::new("c3"), text: "t3".into(), doc_id: "d".into(), token_range: (2, 3), metadata: Default::default() },
        ];
        let results = extract_chunks(model, chunks, 2).await;
        assert_eq!(results.len(), 3);
    }
}
