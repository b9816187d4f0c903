//! `Embedder` — the embedding-model role, alongside [`crate::ChatModel`].
//!
//! `ModelDefaults` already generalizes the teacher's single-model config to
//! per-role defaults (reasoning, fast, embedding); this trait is the
//! embedding role's call surface, kept separate from `ChatModel` because its
//! request/response shape (batches of text in, vectors out) doesn't fit the
//! message/tool-call wire format at all.

use async_trait::async_trait;

use crate::provider::ProviderError;

/// Converts text into dense vectors for similarity search.
///
/// Implemented per-provider alongside `ChatModel`; `axon-retrieval`'s
/// in-memory vector store is the only caller in this workspace.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving order. Returns one vector per
    /// input text, each of length [`Embedder::dimensions`].
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// The fixed dimensionality of vectors this embedder produces.
    fn dimensions(&self) -> usize;
}
