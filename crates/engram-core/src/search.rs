//! # Node Search
//!
//! Two coarse lookups that predate the structured query engine and stay
//! useful for interactive callers: an exact type/metadata match and a
//! case-insensitive free-text scan across all three record families.

use crate::types::{Entity, Metadata};
use serde_json::Value;

impl crate::GraphStore {
    /// Find entities by exact type and metadata equality.
    ///
    /// An empty `entity_type` matches every type; every supplied metadata
    /// key must be present with a structurally equal value.
    #[must_use]
    pub fn search_nodes(&self, entity_type: &str, metadata: &Metadata) -> Vec<Entity> {
        let graph = self.graph().read();

        let mut results = Vec::new();
        for entity in graph.entities.values() {
            if !entity_type.is_empty() && entity.entity_type != entity_type {
                continue;
            }

            let matches = metadata.iter().all(|(key, value)| {
                entity
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get(key))
                    .is_some_and(|existing| existing == value)
            });
            if !matches {
                continue;
            }

            results.push(entity.clone());
        }
        results
    }

    /// Case-insensitive substring search.
    ///
    /// Matches entity name/type/description and string metadata values;
    /// observation content/type/description (adding the observed entity);
    /// and relation type/description (adding both endpoints). Entities
    /// are deduplicated by id. An empty query matches nothing.
    #[must_use]
    pub fn search_by_text(&self, query: &str) -> Vec<Entity> {
        if query.is_empty() {
            return Vec::new();
        }

        let graph = self.graph().read();
        let needle = query.to_lowercase();
        let matches = |text: &str| text.to_lowercase().contains(&needle);

        let mut seen: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        let mut results: Vec<Entity> = Vec::new();
        let mut push = |entity: &Entity, seen: &mut std::collections::BTreeSet<String>| {
            if seen.insert(entity.id.clone()) {
                results.push(entity.clone());
            }
        };

        for entity in graph.entities.values() {
            if seen.contains(&entity.id) {
                continue;
            }

            if matches(&entity.name) || matches(&entity.entity_type) || matches(&entity.description)
            {
                push(entity, &mut seen);
                continue;
            }

            let metadata_hit = entity.metadata.as_ref().is_some_and(|metadata| {
                metadata.values().any(|value| match value {
                    Value::String(text) => matches(text),
                    _ => false,
                })
            });
            if metadata_hit {
                push(entity, &mut seen);
            }
        }

        for observation in graph.observations.values() {
            if seen.contains(&observation.entity_id) {
                continue;
            }
            if matches(&observation.content)
                || matches(&observation.observation_type)
                || matches(&observation.description)
            {
                if let Some(entity) = graph.entities.get(&observation.entity_id) {
                    push(entity, &mut seen);
                }
            }
        }

        for relation in graph.relations.values() {
            if matches(&relation.relation_type) || matches(&relation.description) {
                if let Some(entity) = graph.entities.get(&relation.source) {
                    push(entity, &mut seen);
                }
                if let Some(entity) = graph.entities.get(&relation.target) {
                    push(entity, &mut seen);
                }
            }
        }

        results
    }
}

// =============================================================================
// TESTS
// =============================================================================
