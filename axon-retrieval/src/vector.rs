//! In-memory [`VectorStore`] with deterministic lexical re-ranking.
//!
//! Grounded on the original implementation's NanoVectorDB-backed store: cosine
//! similarity against pre-normalized vectors, re-ranked by a small
//! deterministic keyword signal so acronym-heavy queries (BFS, DFS) aren't
//! lost to embedding noise.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::RwLock;

use axon_core::error::StoreError;
use axon_core::store::{VectorHit, VectorRecord, VectorStore};
use axon_turn::Embedder;

static EN_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]{2,16}").unwrap());
static ZH_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[一-鿿]{3,16}").unwrap());

const STOP_EN: &[&str] = &["trace", "check", "marker", "langsmith", "langchain"];
const MAX_KEYWORDS_EACH: usize = 8;

/// Extract a small, deterministic keyword set for lexical boosting: English
/// tokens of length 2-16 (lowercased, stop-listed) and CJK tokens of length
/// 3-16, each capped at [`MAX_KEYWORDS_EACH`] and de-duplicated in order of
/// first appearance.
fn extract_keywords(query: &str) -> (Vec<String>, Vec<String>) {
    let mut en = Vec::new();
    let mut en_seen = std::collections::HashSet::new();
    for m in EN_TOKEN_RE.find_iter(query) {
        let low = m.as_str().to_lowercase();
        if STOP_EN.contains(&low.as_str()) || !en_seen.insert(low.clone()) {
            continue;
        }
        en.push(low);
        if en.len() >= MAX_KEYWORDS_EACH {
            break;
        }
    }

    let mut zh = Vec::new();
    let mut zh_seen = std::collections::HashSet::new();
    for m in ZH_TOKEN_RE.find_iter(query) {
        let tok = m.as_str().to_string();
        if !zh_seen.insert(tok.clone()) {
            continue;
        }
        zh.push(tok);
        if zh.len() >= MAX_KEYWORDS_EACH {
            break;
        }
    }

    (en, zh)
}

fn keyword_score(content: &str, en: &[String], zh: &[String]) -> usize {
    if content.is_empty() || (en.is_empty() && zh.is_empty()) {
        return 0;
    }
    let lower = content.to_lowercase();
    let mut score = 0;
    for k in en {
        score += lower.matches(k.as_str()).count();
    }
    for k in zh {
        score += content.matches(k.as_str()).count();
    }
    score
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

struct StoredRecord {
    content: String,
    metadata: HashMap<String, serde_json::Value>,
    vector: Vec<f32>,
}

/// An in-memory, process-local [`VectorStore`]. Embeds every upserted
/// record's content through the injected [`Embedder`]; holds everything in
/// a `RwLock<HashMap<..>>` rather than a persisted index.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl InMemoryVectorStore {
    /// Build an empty store backed by `embedder`.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Re-rank `order_by_score` (cosine-sorted indices into `pool`) by the
    /// deterministic keyword signal, per the algorithm: indices with
    /// `keyword_score > 0` sorted by `(keyword_score desc, cosine desc)`
    /// come first, up to `top_k`; the remainder backfills from the cosine
    /// ranking, excluding indices already chosen.
    fn rerank(
        pool: &[(&String, &StoredRecord, f32)],
        en: &[String],
        zh: &[String],
        top_k: usize,
    ) -> Vec<VectorHit> {
        let n = pool.len();
        let k = top_k.min(n);
        if k == 0 {
            return Vec::new();
        }

        let mut order_by_score: Vec<usize> = (0..n).collect();
        order_by_score.sort_by(|&a, &b| pool[b].2.partial_cmp(&pool[a].2).unwrap_or(std::cmp::Ordering::Equal));

        let mut keyword_scores: Option<Vec<usize>> = None;
        let mut selected = Vec::new();
        let mut seen = std::collections::HashSet::new();

        if !en.is_empty() || !zh.is_empty() {
            let scores: Vec<usize> = pool.iter().map(|(_, rec, _)| keyword_score(&rec.content, en, zh)).collect();
            let mut hit_idxs: Vec<usize> = (0..n).filter(|&i| scores[i] > 0).collect();
            hit_idxs.sort_by(|&a, &b| {
                scores[b]
                    .cmp(&scores[a])
                    .then_with(|| pool[b].2.partial_cmp(&pool[a].2).unwrap_or(std::cmp::Ordering::Equal))
            });
            for i in hit_idxs {
                selected.push(i);
                seen.insert(i);
                if selected.len() >= k {
                    break;
                }
            }
            keyword_scores = Some(scores);
        }

        if selected.len() < k {
            for i in order_by_score {
                if seen.contains(&i) {
                    continue;
                }
                selected.push(i);
                if selected.len() >= k {
                    break;
                }
            }
        }

        selected
            .into_iter()
            .map(|i| {
                let (id, rec, score) = &pool[i];
                let mut metadata = rec.metadata.clone();
                if let Some(scores) = &keyword_scores {
                    metadata.insert("keyword_score".into(), serde_json::json!(scores[i]));
                }
                VectorHit {
                    id: (*id).clone(),
                    score: *score,
                    content: rec.content.clone(),
                    metadata,
                }
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<VectorHit>, StoreError> {
        let qvecs = self
            .embedder
            .embed(&[query_text.to_string()])
            .await
            .map_err(|e| StoreError::Other(Box::new(e)))?;
        let qvec = qvecs.into_iter().next().unwrap_or_default();

        let (en, zh) = extract_keywords(query_text);
        let records = self.records.read().await;
        let pool: Vec<(&String, &StoredRecord, f32)> =
            records.iter().map(|(id, rec)| (id, rec, cosine(&qvec, &rec.vector))).collect();

        Ok(Self::rerank(&pool, &en, &zh, top_k))
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let contents: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let vectors = self.embedder.embed(&contents).await.map_err(|e| StoreError::Other(Box::new(e)))?;

        let mut guard = self.records.write().await;
        for (record, vector) in records.into_iter().zip(vectors.into_iter()) {
            guard.insert(
                record.id,
                StoredRecord {
                    content: record.content,
                    metadata: record.metadata,
                    vector,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn finalize(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A hash-projection [`Embedder`] with no external dependency: each token is
/// hashed into a fixed-width bag-of-words vector, which is then L2-normalized.
/// Deterministic and offline, suitable as the reference adapter's default;
/// real deployments plug in a provider-backed embedder instead.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    /// Build an embedder producing vectors of width `dims`.
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, axon_turn::ProviderError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

impl HashingEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        let mut vec = vec![0f32; self.dims];
        for tok in text.split_whitespace() {
            let low = tok.to_lowercase();
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            low.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dims;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vec[idx] += sign;
        }
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vec.iter_mut() {
                *x /= norm;
            }
        }
        vec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_en_and_zh_keywords_with_stop_list() {
        let (en, zh) = extract_keywords("What is BFS trace and 广度优先搜索?");
        assert_eq!(en, vec!["what", "is", "bfs", "and"]);
        assert_eq!(zh, vec!["广度优先搜索"]);
    }

    #[test]
    fn keyword_score_counts_occurrences() {
        let score = keyword_score("BFS uses a queue. bfs is a graph algorithm.", &["bfs".to_string()], &[]);
        assert_eq!(score, 2);
    }

    #[tokio::test]
    async fn query_prefers_keyword_hits_over_pure_cosine() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = InMemoryVectorStore::new(embedder);
        store
            .upsert(vec![
                VectorRecord {
                    id: "a".into(),
                    content: "Breadth first search explores nodes level by level using a queue".into(),
                    metadata: HashMap::new(),
                },
                VectorRecord {
                    id: "b".into(),
                    content: "Depth first search explores as far as possible before backtracking".into(),
                    metadata: HashMap::new(),
                },
            ])
            .await
            .unwrap();

        let hits = store.query("BFS queue", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].metadata.contains_key("keyword_score"));
    }

    #[tokio::test]
    async fn query_backfills_from_cosine_when_no_keyword_hits() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = InMemoryVectorStore::new(embedder);
        store
            .upsert(vec![VectorRecord {
                id: "a".into(),
                content: "unrelated passage about sorting networks".into(),
                metadata: HashMap::new(),
            }])
            .await
            .unwrap();

        let hits = store.query("completely different wording", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].metadata.contains_key("keyword_score"));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = InMemoryVectorStore::new(embedder);
        store
            .upsert(vec![VectorRecord { id: "a".into(), content: "x".into(), metadata: HashMap::new() }])
            .await
            .unwrap();
        store.delete(&["a".to_string()]).await.unwrap();
        let hits = store.query("x", 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
