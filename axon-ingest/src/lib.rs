//! # axon-ingest — knowledge-graph ingestion pipeline
//!
//! Turns raw documents into the entities and relations the orchestration
//! core's retrieval tools read back out: chunk the text, extract entities
//! and relations per chunk, merge same-name entities across chunks, run two
//! dedup layers (deterministic alias cross-reference, then one model-driven
//! consolidation pass), remap relations through the resulting name map, and
//! write the result to a `VectorStore`/`GraphStore` pair.
//!
//! ## Modules
//!
//! | Module | What it holds |
//! |--------|----------------|
//! | [`types`] | `TextChunk`, `Entity`, `Relation`, stable-hash id scheme |
//! | [`chunker`] | Token-window sliding chunker |
//! | [`extractor`] | Per-chunk entity/relation extraction |
//! | [`merge`] | Cross-chunk and per-group entity merge |
//! | [`dedup`] | Two-layer entity deduplication |
//! | [`remap`] | Relation endpoint resolution through the dedup name map |
//! | [`pipeline`] | Wires the above into one document/batch ingestion run |
//! | [`error`] | `IngestError` |

#![deny(missing_docs)]

pub mod chunker;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod merge;
pub mod pipeline;
pub mod remap;
pub mod types;

pub use chunker::chunk_text;
pub use dedup::{dedup_layer1, dedup_layer2, NameMap};
pub use error::IngestError;
pub use extractor::{extract_chunk, extract_chunks, ExtractionResult};
pub use merge::{merge_cross_chunk, merge_group};
pub use pipeline::{ingest_document, ingest_documents, IngestConfig, IngestDocument, IngestModels, IngestSummary};
pub use remap::{remap_relations, resolve_transitively};
pub use types::{
    canonicalize_name, chunk_id_for, entity_id_for, stable_hash, Entity, EntityType, Relation, RelationType, TextChunk,
};
