//! Errors from the ingestion pipeline.

use thiserror::Error;

/// Errors from chunking, extraction, dedup, or remap.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IngestError {
    /// `chunk_size` was zero, or `overlap >= chunk_size` (spec §4.7
    /// "Preconditions").
    #[error("invalid chunk parameters: chunk_size={chunk_size}, overlap={overlap}")]
    InvalidChunkParams {
        /// The rejected `chunk_size`.
        chunk_size: usize,
        /// The rejected `overlap`.
        overlap: usize,
    },

    /// A model call (extraction, dedup layer 2) failed.
    #[error("model error: {0}")]
    Model(String),

    /// The model's JSON output could not be parsed, even after the one
    /// retry (spec §4.7 "Parse JSON with one retry on empty parse").
    #[error("could not parse model output as JSON: {0}")]
    UnparseableOutput(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
