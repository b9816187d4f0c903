//! Two-layer entity deduplication (spec §4.7 "Dedup layer 1"/"Dedup layer
//! 2"): a deterministic alias cross-reference union-find pass, followed by
//! one model-driven consolidation pass.

use std::collections::{HashMap, HashSet};

use axon_turn::{ChatModel, ContentPart, ProviderMessage, ProviderRequest, Role};
use serde::Deserialize;
use serde_json::Value;

use crate::error::IngestError;
use crate::merge::merge_group;
use crate::types::{canonicalize_name, Entity};

/// A partial function from a displaced entity name to the canonical name it
/// was folded into. Not necessarily transitively closed by itself — callers
/// apply [`crate::remap::resolve_transitively`] to follow chains produced
/// by composing layer 1 and layer 2.
pub type NameMap = HashMap<String, String>;

/// Small index-keyed union-find (spec §9 "no pointer cycles").
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Deterministic alias cross-reference dedup (spec §4.7 "Dedup layer 1").
///
/// Unions entity `A` with entity `B` iff `lower(A.name)` equals
/// `lower(b)` for some alias `b` of `B` (checked both directions by
/// iterating every entity's own alias list against the others' names).
/// Alias-to-alias overlap never unions two entities — only a name-to-alias
/// match does, per spec ("too noisy" otherwise). Each connected component
/// collapses to one entity named after the longest member name; every
/// displaced name is recorded in the returned [`NameMap`].
pub fn dedup_layer1(entities: Vec<Entity>) -> (Vec<Entity>, NameMap) {
    let n = entities.len();
    if n == 0 {
        return (Vec::new(), NameMap::new());
    }

    let mut name_index: HashMap<String, usize> = HashMap::new();
    for (i, e) in entities.iter().enumerate() {
        let key = canonicalize_name(&e.name);
        if key.len() >= 2 {
            name_index.insert(key, i);
        }
    }

    let mut uf = UnionFind::new(n);
    for (i, e) in entities.iter().enumerate() {
        for alias in &e.aliases {
            let key = canonicalize_name(alias);
            if key.len() < 2 {
                continue;
            }
            if let Some(&j) = name_index.get(&key) {
                if j != i {
                    uf.union(i, j);
                }
            }
        }
    }

    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..n {
        let root = uf.find(i);
        components.entry(root).or_default().push(i);
    }

    let mut name_map = NameMap::new();
    let mut merged = Vec::with_capacity(components.len());

    // Stable output order: by each component's smallest original index.
    let mut roots: Vec<usize> = components.keys().copied().collect();
    roots.sort_by_key(|&r| *components[&r].iter().min().unwrap());

    for root in roots {
        let indices = &components[&root];
        let canonical_name = indices
            .iter()
            .map(|&i| entities[i].name.as_str())
            .max_by_key(|name| name.chars().count())
            .expect("component is never empty")
            .to_string();

        for &i in indices {
            if entities[i].name != canonical_name {
                name_map.insert(entities[i].name.clone(), canonical_name.clone());
            }
        }

        let group: Vec<Entity> = indices.iter().map(|&i| entities[i].clone()).collect();
        merged.push(merge_group(group, &canonical_name));
    }

    (merged, name_map)
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    canonical: String,
    #[serde(default)]
    duplicates: Vec<String>,
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

fn parse_groups(raw: &str) -> Vec<RawGroup> {
    let stripped = strip_fences(raw);
    let Some(start) = stripped.find('[') else { return Vec::new() };
    let Some(end) = stripped.rfind(']') else { return Vec::new() };
    if end <= start {
        return Vec::new();
    }
    serde_json::from_str(&stripped[start..=end]).unwrap_or_default()
}

fn render_listing(entities: &[Entity]) -> String {
    entities
        .iter()
        .enumerate()
        .map(|(i, e)| {
            if e.aliases.is_empty() {
                format!("{}. {}", i + 1, e.name)
            } else {
                format!("{}. {} (aliases: {})", i + 1, e.name, e.aliases.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_layer2_request(entities: &[Entity]) -> ProviderRequest {
    let system = "You review a numbered list of entities for remaining duplicates an earlier alias \
         pass missed (different names for the same underlying concept). Respond with ONLY a JSON array \
         of groups of the form {\"canonical\": <existing name from the list>, \"duplicates\": [<existing \
         names from the list>]}. Every name you reference MUST be copied verbatim from the list. If there \
         are no further duplicates, respond with an empty array []."
        .to_string();
    let user = render_listing(entities);
    ProviderRequest {
        model: None,
        messages: vec![ProviderMessage { role: Role::User, content: vec![ContentPart::Text { text: user }] }],
        tools: Vec::new(),
        max_tokens: None,
        temperature: None,
        system: Some(system),
        timeout: None,
        extra: Value::Null,
    }
}

/// Model-driven consolidation pass (spec §4.7 "Dedup layer 2"): a single
/// call asks the model for remaining duplicate groups among the entities
/// `dedup_layer1` left standing. A group is only honored if its `canonical`
/// name is among the current entity names; unknown `duplicates` entries are
/// ignored rather than rejecting the whole group.
pub async fn dedup_layer2(model: &dyn ChatModel, entities: Vec<Entity>) -> Result<(Vec<Entity>, NameMap), IngestError> {
    let response = model
        .complete(build_layer2_request(&entities))
        .await
        .map_err(|e| IngestError::Model(e.to_string()))?;
    let groups = parse_groups(&response.text());

    let mut working: HashMap<String, Entity> = entities.into_iter().map(|e| (e.name.clone(), e)).collect();
    let valid_names: HashSet<String> = working.keys().cloned().collect();
    let mut name_map = NameMap::new();

    for group in groups {
        if !valid_names.contains(&group.canonical) {
            continue;
        }
        let mut members = Vec::new();
        if let Some(canonical_entity) = working.remove(&group.canonical) {
            members.push(canonical_entity);
        } else {
            // Already absorbed into an earlier group this pass; nothing left to merge.
            continue;
        }
        for dup_name in &group.duplicates {
            if dup_name == &group.canonical {
                continue;
            }
            if let Some(dup_entity) = working.remove(dup_name) {
                members.push(dup_entity);
                name_map.insert(dup_name.clone(), group.canonical.clone());
            }
        }
        let merged = merge_group(members, &group.canonical);
        working.insert(group.canonical.clone(), merged);
    }

    let merged_entities: Vec<Entity> = working.into_values().collect();
    Ok((merged_entities, name_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axon_turn::{DeltaStream, ProviderError, ProviderResponse, StopReason, TokenUsage};
    use crate::types::EntityType;
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
            unimplemented!("layer2 only uses complete()")
        }
        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn with_alias(name: &str, aliases: &[&str]) -> Entity {
        let mut e = Entity::new(name, EntityType::Algorithm, "");
        e.aliases = aliases.iter().map(|a| a.to_string()).collect();
        e
    }

    #[test]
    fn single_entity_is_identity() {
        let (merged, name_map) = dedup_layer1(vec![with_alias("BFS", &[])]);
        assert_eq!(merged.len(), 1);
        assert!(name_map.is_empty());
    }

    #[test]
    fn name_to_alias_match_unions_two_entities() {
        let a = with_alias("Breadth-First Search", &["BFS"]);
        let b = with_alias("BFS", &[]);
        let (merged, name_map) = dedup_layer1(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Breadth-First Search");
        assert_eq!(name_map.get("BFS"), Some(&"Breadth-First Search".to_string()));
    }

    #[test]
    fn alias_to_alias_overlap_does_not_union() {
        let a = with_alias("Foo", &["shared"]);
        let b = with_alias("Bar", &["shared"]);
        let (merged, name_map) = dedup_layer1(vec![a, b]);
        assert_eq!(merged.len(), 2);
        assert!(name_map.is_empty());
    }

    #[test]
    fn canonical_name_is_the_longest_in_the_component() {
        let a = with_alias("BFS", &[]);
        let b = with_alias("Breadth-First Search", &["BFS"]);
        let c = with_alias("广度优先搜索", &["BFS"]);
        let (merged, _) = dedup_layer1(vec![a, b, c]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Breadth-First Search");
        assert!(merged[0].aliases.contains(&"BFS".to_string()));
        assert!(merged[0].aliases.contains(&"广度优先搜索".to_string()));
    }

    #[test]
    fn applying_layer1_twice_is_idempotent() {
        let a = with_alias("BFS", &[]);
        let b = with_alias("Breadth-First Search", &["BFS"]);
        let (first_pass, _) = dedup_layer1(vec![a, b]);
        let (_, second_name_map) = dedup_layer1(first_pass);
        assert!(second_name_map.is_empty());
    }

    #[tokio::test]
    async fn layer2_merges_accepted_group() {
        let entities = vec![Entity::new("Breadth-First Search", EntityType::Algorithm, ""), Entity::new("BFS algorithm", EntityType::Algorithm, "")];
        let raw = r#"[{"canonical": "Breadth-First Search", "duplicates": ["BFS algorithm"]}]"#;
        let model = ScriptedModel::new(vec![raw]);
        let (merged, name_map) = dedup_layer2(&model, entities).await.unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(name_map.get("BFS algorithm"), Some(&"Breadth-First Search".to_string()));
    }

    #[tokio::test]
    async fn layer2_rejects_group_with_unknown_canonical() {
        let entities = vec![Entity::new("BFS", EntityType::Algorithm, "")];
        let raw = r#"[{"canonical": "Not In List", "duplicates": ["BFS"]}]"#;
        let model = ScriptedModel::new(vec![raw]);
        let (merged, name_map) = dedup_layer2(&model, entities).await.unwrap();
        assert_eq!(merged.len(), 1);
        assert!(name_map.is_empty());
    }

    #[tokio::test]
    async fn layer2_empty_array_is_a_no_op() {
        let entities = vec![Entity::new("BFS", EntityType::Algorithm, "")];
        let model = ScriptedModel::new(vec!["[]"]);
        let (merged, name_map) = dedup_layer2(&model, entities).await.unwrap();
        assert_eq!(merged.len(), 1);
        assert!(name_map.is_empty());
    }

    proptest::proptest! {
        /// Layer 1 never produces more entities than it was given, and never
        /// fewer than one connected component can account for (it only
        /// merges, never invents or drops a whole entity).
        #[test]
        fn prop_layer1_never_grows_the_entity_count(names in proptest::collection::vec("[A-Za-z]{2,10}", 1..15)) {
            let entities: Vec<Entity> = names.iter().map(|n| with_alias(n, &[])).collect();
            let input_len = entities.len();
            let (merged, _) = dedup_layer1(entities);
            proptest::prop_assert!(merged.len() <= input_len);
            proptest::prop_assert!(!merged.is_empty());
        }

        /// Running layer 1 on its own output is always a no-op: the second
        /// pass's name map is always empty (spec §9 "dedup is a closure
        /// operation, re-running it changes nothing").
        #[test]
        fn prop_layer1_is_idempotent(names in proptest::collection::vec("[A-Za-z]{2,10}", 1..15)) {
            let entities: Vec<Entity> = names.iter().map(|n| with_alias(n, &[])).collect();
            let (first_pass, _) = dedup_layer1(entities);
            let (_, second_name_map) = dedup_layer1(first_pass);
            proptest::prop_assert!(second_name_map.is_empty());
        }
    }
}
