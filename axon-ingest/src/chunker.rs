//! Token-based sliding-window chunker (spec §4.7 "Chunker").
//!
//! Tokenization here is whitespace-splitting, not a model-specific
//! tokenizer: the spec only requires windows measured in a consistent unit,
//! and a consistent unit is all the downstream chunk-id-stability and
//! overlap invariants depend on.

use crate::error::IngestError;
use crate::types::{chunk_id_for, TextChunk};

/// Slide a `chunk_size`-token window over `text` by `chunk_size - overlap`
/// tokens until exhausted, producing one [`TextChunk`] per window.
///
/// Preconditions (spec §4.7): `chunk_size > 0` and `0 <= overlap <
/// chunk_size`; violating either is a validation error, never a panic.
/// Empty input yields an empty list. Chunking the same `(text, doc_id,
/// chunk_size, overlap)` twice yields byte-identical ids and contents
/// (spec §8 "Round-trip / idempotence").
pub fn chunk_text(text: &str, doc_id: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>, IngestError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(IngestError::InvalidChunkParams { chunk_size, overlap });
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let stride = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    while start < tokens.len() {
        let end = (start + chunk_size).min(tokens.len());
        let chunk_tokens = &tokens[start..end];
        chunks.push(TextChunk {
            id: chunk_id_for(doc_id, index),
            text: chunk_tokens.join(" "),
            doc_id: doc_id.to_string(),
            token_range: (start, end),
            metadata: Default::default(),
        });

        index += 1;
        if end == tokens.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}
