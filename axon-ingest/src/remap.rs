//! Relation remap (spec §4.7 "Relation remap"): resolve every relation
//! endpoint through the transitive closure of the combined dedup
//! `NameMap`, drop self-loops, and deduplicate `(source, target, type)`
//! triples.

use std::collections::HashSet;

use crate::dedup::NameMap;
use crate::types::Relation;

/// Follow `name_map` from `name` until a fixed point (a name with no
/// further mapping), guarding against a cyclical map so this always
/// terminates.
pub fn resolve_transitively<'a>(name: &'a str, name_map: &'a NameMap) -> &'a str {
    let mut current = name;
    let mut seen = HashSet::new();
    seen.insert(current);
    while let Some(next) = name_map.get(current) {
        if !seen.insert(next.as_str()) {
            // Cycle in the name map; stop at the last name seen rather than loop forever.
            break;
        }
        current = next.as_str();
    }
    current
}

/// Resolve every relation's `source`/`target` through `name_map`'s
/// transitive closure, drop self-loops produced by the resolution, and
/// deduplicate `(source, target, type)` triples (first occurrence's
/// description/weight wins).
pub fn remap_relations(relations: Vec<Relation>, name_map: &NameMap) -> Vec<Relation> {
    let mut seen = HashSet::new();
    let mut remapped = Vec::with_capacity(relations.len());

    for mut relation in relations {
        let source = resolve_transitively(&relation.source, name_map).to_string();
        let target = resolve_transitively(&relation.target, name_map).to_string();
        if source == target {
            continue;
        }
        let key = (source.clone(), target.clone(), relation.relation_type);
        if !seen.insert(key) {
            continue;
        }
        relation.source = source;
        relation.target = target;
        remapped.push(relation);
    }

    remapped
}
