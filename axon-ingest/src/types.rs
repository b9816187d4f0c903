//! Ingestion data model (spec §3): `TextChunk`, `Entity`, `Relation`, and
//! the stable-hash id scheme shared by chunk and entity ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use axon_core::{ChunkId, EntityId};

/// Hash a string to a stable hex id. Used for both `ChunkId` (over
/// `"doc_id::index"`) and `EntityId` (over the canonical name) so that
/// re-chunking or re-deduping the same input is idempotent (spec §3
/// "id is stable so re-chunking is idempotent"; spec §8 "stable_hash(name)
/// == stable_hash(\"  \" + name.upper() + \"  \")").
pub fn stable_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonicalize a name before hashing or comparing: trim surrounding
/// whitespace, lowercase. Per spec §3 invariant: `id == stable_hash(lower(trim(name)))`.
pub fn canonicalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Compute the id an `Entity` with this display `name` must carry.
pub fn entity_id_for(name: &str) -> EntityId {
    EntityId::new(stable_hash(&canonicalize_name(name)))
}

/// Compute the stable chunk id for ordinal `index` of `doc_id` (spec §3
/// "Chunk id = stable hash of `doc_id::index`").
pub fn chunk_id_for(doc_id: &str, index: usize) -> ChunkId {
    ChunkId::new(stable_hash(&format!("{doc_id}::{index}")))
}

/// A token-window slice of a source document (spec §3 `TextChunk`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Stable id derived from `doc_id` and `index`.
    pub id: ChunkId,
    /// The chunk's raw text.
    pub text: String,
    /// The source document this chunk came from.
    pub doc_id: String,
    /// Token offset range `[start, end)` within the source document.
    pub token_range: (usize, usize),
    /// Free metadata, e.g. section headers, page numbers.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// One of the five closed entity types (spec §3 `Entity.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EntityType {
    /// An algorithm, e.g. "Breadth-First Search".
    Algorithm,
    /// A data structure, e.g. "Binary Heap".
    DataStructure,
    /// A general technique, e.g. "Two Pointers".
    Technique,
    /// A specific problem or exercise.
    Problem,
    /// A conceptual idea not covered by the other four.
    Concept,
}

impl EntityType {
    /// All closed-set variants, in a fixed order used for majority-vote
    /// tie-breaking during merge (earlier wins a tie).
    pub const ALL: [EntityType; 5] =
        [EntityType::Algorithm, EntityType::DataStructure, EntityType::Technique, EntityType::Problem, EntityType::Concept];

    /// Parse a type name leniently (case-insensitive, tolerates the
    /// extractor emitting `"data_structure"` or `"Data Structure"`).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace(['_', '-', ' '], "");
        match normalized.as_str() {
            "algorithm" => Some(EntityType::Algorithm),
            "datastructure" => Some(EntityType::DataStructure),
            "technique" => Some(EntityType::Technique),
            "problem" => Some(EntityType::Problem),
            "concept" => Some(EntityType::Concept),
            _ => None,
        }
    }
}

/// A canonical-or-not-yet-deduplicated knowledge entity (spec §3 `Entity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable id; recomputed only on canonical rename during dedup.
    pub id: EntityId,
    /// Canonical display name.
    pub name: String,
    /// One of the closed entity types.
    pub entity_type: EntityType,
    /// Free-text description.
    pub description: String,
    /// Known alternate names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Ids of the chunks this entity was extracted from or merged into.
    #[serde(default)]
    pub source_chunks: Vec<ChunkId>,
}

impl Entity {
    /// Build a fresh entity, computing its id from `name`.
    pub fn new(name: impl Into<String>, entity_type: EntityType, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: entity_id_for(&name),
            name,
            entity_type,
            description: description.into(),
            aliases: Vec::new(),
            source_chunks: Vec::new(),
        }
    }

    /// Recompute `id` from the current `name`. Callers must do this after
    /// any canonical rename (spec §3 invariant).
    pub fn recompute_id(&mut self) {
        self.id = entity_id_for(&self.name);
    }
}

/// One of the seven closed knowledge-relation types (spec §3 `Relation.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// `A` must be understood before `B`.
    #[serde(rename = "PREREQ")]
    Prereq,
    /// `A` is a variant of `B`.
    #[serde(rename = "VARIANT_OF")]
    VariantOf,
    /// `A` improves on `B`.
    #[serde(rename = "IMPROVES")]
    Improves,
    /// `A` uses `B` as a building block.
    #[serde(rename = "USES")]
    Uses,
    /// `A` applies to problem domain `B`.
    #[serde(rename = "APPLIES_TO")]
    AppliesTo,
    /// `A` belongs to the broader topic `B`.
    #[serde(rename = "BELONGS_TO")]
    BelongsTo,
    /// A generic, otherwise-unclassified relation.
    #[serde(rename = "RELATED_TO")]
    RelatedTo,
}

/// A directed, typed edge between two entity names (spec §3 `Relation`).
/// Endpoints are names, not ids, until [`crate::remap::remap_relations`]
/// resolves them against the final entity set (spec §9 "Relations
/// reference entities by name, not by pointer, until remap").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity name, verbatim from the extraction unit.
    pub source: String,
    /// Target entity name, verbatim from the extraction unit.
    pub target: String,
    /// The relation's type.
    pub relation_type: RelationType,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Edge weight, default 1.0.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl Relation {
    /// Build a relation with the default weight.
    pub fn new(source: impl Into<String>, target: impl Into<String>, relation_type: RelationType) -> Self {
        Self { source: source.into(), target: target.into(), relation_type, description: String::new(), weight: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_matches_stable_hash_of_canonical_name() {
        let e = Entity::new("Breadth-First Search", EntityType::Algorithm, "");
        assert_eq!(e.id, entity_id_for("Breadth-First Search"));
        assert_eq!(e.id.as_str(), stable_hash("breadth-first search"));
    }

    #[test]
    fn entity_id_is_invariant_to_case_and_padding() {
        assert_eq!(entity_id_for("BFS"), entity_id_for("  BFS  "));
        assert_eq!(entity_id_for("bfs"), entity_id_for("  BFS  "));
        assert_eq!(entity_id_for("BFS"), entity_id_for("bfs"));
    }

    #[test]
    fn chunk_id_is_deterministic_per_doc_and_index() {
        assert_eq!(chunk_id_for("doc-1", 3), chunk_id_for("doc-1", 3));
        assert_ne!(chunk_id_for("doc-1", 3), chunk_id_for("doc-1", 4));
        assert_ne!(chunk_id_for("doc-1", 0), chunk_id_for("doc-2", 0));
    }

    #[test]
    fn entity_type_parse_is_lenient() {
        assert_eq!(EntityType::parse("data_structure"), Some(EntityType::DataStructure));
        assert_eq!(EntityType::parse("Data Structure"), Some(EntityType::DataStructure));
        assert_eq!(EntityType::parse("ALGORITHM"), Some(EntityType::Algorithm));
        assert_eq!(EntityType::parse("not-a-type"), None);
    }

    #[test]
    fn recompute_id_follows_rename() {
        let mut e = Entity::new("BFS", EntityType::Algorithm, "");
        let old_id = e.id.clone();
        e.name = "Breadth-First Search".to_string();
        e.recompute_id();
        assert_ne!(e.id, old_id);
        assert_eq!(e.id, entity_id_for("Breadth-First Search"));
    }

    proptest::proptest! {
        /// `entity_id_for` is invariant to surrounding whitespace and case,
        /// for any name (spec §8 "stable_hash(name) ==
        /// stable_hash(\"  \" + name.upper() + \"  \")").
        #[test]
        fn prop_entity_id_ignores_case_and_padding(name in "[A-Za-z ]{1,20}") {
            let padded_upper = format!("  {}  ", name.to_uppercase());
            proptest::prop_assert_eq!(entity_id_for(&name), entity_id_for(&padded_upper));
        }

        /// Chunk ids are a pure function of `(doc_id, index)`: equal inputs
        /// always produce equal ids, and changing either input changes it.
        #[test]
        fn prop_chunk_id_is_a_pure_function_of_doc_and_index(doc_id in "[a-z0-9-]{1,12}", index in 0usize..50) {
            proptest::prop_assert_eq!(chunk_id_for(&doc_id, index), chunk_id_for(&doc_id, index));
        }
    }
}
