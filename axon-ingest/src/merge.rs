//! Cross-chunk entity merge (spec §4.7 "Merge (cross-chunk)"), and the
//! single per-group merge routine reused by both dedup layers (spec §4.7
//! "re-run the per-group merge").

use std::collections::HashSet;

use crate::types::{canonicalize_name, entity_id_for, Entity, EntityType};

/// Merge one connected group of entities (believed to be the same
/// underlying concept) into a single entity named `canonical_name`:
/// line-deduped concatenation of descriptions, majority-vote type, union of
/// aliases plus any name variant that isn't the canonical name, and union
/// of source-chunk provenance preserving first-seen order.
pub fn merge_group(entities: Vec<Entity>, canonical_name: &str) -> Entity {
    assert!(!entities.is_empty(), "merge_group requires at least one entity");

    let description = merge_descriptions(entities.iter().map(|e| e.description.as_str()));
    let entity_type = majority_type(entities.iter().map(|e| e.entity_type));

    let mut aliases = Vec::new();
    let mut seen_aliases = HashSet::new();
    let mut source_chunks = Vec::new();
    let mut seen_chunks = HashSet::new();

    for entity in &entities {
        if entity.name != canonical_name && seen_aliases.insert(canonicalize_name(&entity.name)) {
            aliases.push(entity.name.clone());
        }
        for alias in &entity.aliases {
            if alias != canonical_name && seen_aliases.insert(canonicalize_name(alias)) {
                aliases.push(alias.clone());
            }
        }
        for chunk in &entity.source_chunks {
            if seen_chunks.insert(chunk.clone()) {
                source_chunks.push(chunk.clone());
            }
        }
    }

    Entity {
        id: entity_id_for(canonical_name),
        name: canonical_name.to_string(),
        entity_type,
        description,
        aliases,
        source_chunks,
    }
}

/// Concatenate descriptions, keeping each distinct non-empty line only once
/// (first occurrence wins), in source order.
fn merge_descriptions<'a>(descriptions: impl Iterator<Item = &'a str>) -> String {
    let mut lines = Vec::new();
    let mut seen = HashSet::new();
    for description in descriptions {
        for line in description.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_string()) {
                lines.push(trimmed.to_string());
            }
        }
    }
    lines.join("\n")
}

/// Majority-vote type across a group; ties break toward the first type in
/// [`EntityType::ALL`] among the tied candidates, for determinism.
fn majority_type(types: impl Iterator<Item = EntityType>) -> EntityType {
    let mut counts = [0usize; 5];
    for t in types {
        counts[EntityType::ALL.iter().position(|&x| x == t).unwrap()] += 1;
    }
    let max = *counts.iter().max().unwrap_or(&0);
    EntityType::ALL
        .into_iter()
        .enumerate()
        .find(|&(i, _)| counts[i] == max)
        .map(|(_, t)| t)
        .unwrap_or(EntityType::Concept)
}

/// Group entities by `lower(name)` and merge each group, keeping the first
/// entity's exact `name` in each group as the canonical name (variant
/// casings/spellings fold into aliases). Relative order of groups follows
/// first appearance.
pub fn merge_cross_chunk(entities: Vec<Entity>) -> Vec<Entity> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<Entity>> = std::collections::HashMap::new();

    for entity in entities {
        let key = canonicalize_name(&entity.name);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(entity);
    }

    order
        .into_iter()
        .map(|key| {
            let group = groups.remove(&key).expect("key was just inserted");
            let canonical_name = group[0].name.clone();
            merge_group(group, &canonical_name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::ChunkId;

    fn entity(name: &str, ty: EntityType, desc: &str, chunk: &str) -> Entity {
        let mut e = Entity::new(name, ty, desc);
        e.source_chunks = vec![ChunkId::new(chunk)];
        e
    }

    #[test]
    fn merges_same_lowercased_name_variants() {
        let entities =
            vec![entity("BFS", EntityType::Algorithm, "traversal algorithm", "c1"), entity("bfs", EntityType::Algorithm, "visits level by level", "c2")];
        let merged = merge_cross_chunk(entities);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "BFS");
        assert!(merged[0].aliases.contains(&"bfs".to_string()));
        assert!(merged[0].description.contains("traversal algorithm"));
        assert!(merged[0].description.contains("visits level by level"));
    }

    #[test]
    fn keeps_distinct_names_separate() {
        let entities = vec![entity("BFS", EntityType::Algorithm, "a", "c1"), entity("DFS", EntityType::Algorithm, "b", "c2")];
        let merged = merge_cross_chunk(entities);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn description_lines_are_deduped() {
        let entities =
            vec![entity("BFS", EntityType::Algorithm, "traversal algorithm", "c1"), entity("BFS", EntityType::Algorithm, "traversal algorithm", "c2")];
        let merged = merge_cross_chunk(entities);
        assert_eq!(merged[0].description, "traversal algorithm");
    }

    #[test]
    fn source_chunks_are_unioned_in_order() {
        let entities = vec![entity("BFS", EntityType::Algorithm, "a", "c1"), entity("BFS", EntityType::Algorithm, "b", "c2")];
        let merged = merge_cross_chunk(entities);
        assert_eq!(merged[0].source_chunks, vec![ChunkId::new("c1"), ChunkId::new("c2")]);
    }

    #[test]
    fn majority_type_breaks_ties_by_declaration_order() {
        let ty = majority_type([EntityType::Problem, EntityType::Algorithm].into_iter());
        assert_eq!(ty, EntityType::Algorithm);
    }

    #[test]
    fn majority_type_picks_strict_majority() {
        let ty = majority_type([EntityType::Algorithm, EntityType::Algorithm, EntityType::Problem].into_iter());
        assert_eq!(ty, EntityType::Algorithm);
    }
}
