//! # Metadata Mutation
//!
//! Dot-path updates on entity metadata: `merge`, `replace` and `delete`,
//! applied to one entity or to every entity matching a coarse filter.
//!
//! Unlike the field extractor, the mutator interprets dots as nested map
//! traversal: `a.b.c` descends into (and for merge/replace auto-creates)
//! intermediate maps. Updates are transactional per call: the pre-image
//! of every affected entity's metadata is captured, and the first error —
//! or a failed save — restores all of them.

use crate::types::{Entity, EngramError, EntityFilter, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a dot-path update treats the leaf key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataOp {
    /// Overlay the new value; when both sides are maps, keys from the new
    /// map overwrite keys in the existing map (one level), otherwise the
    /// new value replaces the old outright.
    Merge,
    /// Always overwrite the leaf.
    Replace,
    /// Remove the leaf key; the supplied value is ignored.
    Delete,
}

impl Default for MetadataOp {
    fn default() -> Self {
        Self::Merge
    }
}

// =============================================================================
// DOT-PATH APPLICATION
// =============================================================================

/// Apply one update to a potentially nested path within a metadata map.
///
/// Intermediate maps are auto-created for `merge`/`replace`; for
/// `delete` an absent intermediate makes the whole path a no-op. A
/// non-map intermediate is `BadArgument` (again excepting `delete`,
/// where the path is simply treated as non-existent).
pub(crate) fn set_nested_value(
    map: &mut Metadata,
    path: &str,
    value: &Value,
    op: MetadataOp,
) -> Result<(), EngramError> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = map;

    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            match op {
                MetadataOp::Delete => {
                    current.remove(*part);
                }
                MetadataOp::Replace => {
                    current.insert((*part).to_string(), value.clone());
                }
                MetadataOp::Merge => {
                    let overwrite = match current.get_mut(*part) {
                        Some(Value::Object(existing)) => {
                            if let Value::Object(incoming) = value {
                                for (key, item) in incoming {
                                    existing.insert(key.clone(), item.clone());
                                }
                                false
                            } else {
                                true
                            }
                        }
                        Some(_) => true,
                        None => true,
                    };
                    if overwrite {
                        current.insert((*part).to_string(), value.clone());
                    }
                }
            }
            return Ok(());
        }

        if !current.contains_key(*part) {
            if op == MetadataOp::Delete {
                return Ok(());
            }
            current.insert((*part).to_string(), Value::Object(Metadata::new()));
        }
        match current.get_mut(*part) {
            Some(Value::Object(next)) => current = next,
            Some(_) => {
                if op == MetadataOp::Delete {
                    return Ok(());
                }
                return Err(EngramError::BadArgument(format!(
                    "cannot set value at path '{path}': segment '{part}' is not a map"
                )));
            }
            None => {
                return Err(EngramError::Internal(
                    "intermediate map vanished during path traversal".into(),
                ));
            }
        }
    }

    Ok(())
}

// =============================================================================
// STORE ENTRY POINTS
// =============================================================================

impl crate::GraphStore {
    /// Apply dot-path metadata updates to a single entity.
    ///
    /// Returns the entity as it was updated in memory and then saved.
    pub fn update_entity_metadata(
        &self,
        entity_id: &str,
        updates: &Metadata,
        op: MetadataOp,
    ) -> Result<Entity, EngramError> {
        let mut graph = self.graph().write();

        let entity = graph.entities.get_mut(entity_id).ok_or_else(|| {
            EngramError::NotFound(format!("entity with id {entity_id} not found"))
        })?;

        // Deleting from absent metadata is a no-op on the whole call.
        if entity.metadata.is_none() && op == MetadataOp::Delete {
            return Ok(entity.clone());
        }

        let pre_image = entity.metadata.clone();
        let metadata = entity.metadata.get_or_insert_with(Metadata::new);
        for (path, value) in updates {
            if let Err(err) = set_nested_value(metadata, path, value, op) {
                entity.metadata = pre_image;
                return Err(err);
            }
        }
        let updated = entity.clone();
        drop(graph);

        let id = entity_id.to_string();
        self.persist_or_rollback(move |graph| {
            if let Some(entity) = graph.entities.get_mut(&id) {
                entity.metadata = pre_image;
            }
        })?;
        Ok(updated)
    }

    /// Apply dot-path metadata updates to every entity matching `filter`.
    ///
    /// At least one filter criterion must be non-empty. Returns the
    /// updated entities; an empty match set is not an error.
    pub fn bulk_update_metadata(
        &self,
        filter: &EntityFilter,
        updates: &Metadata,
        op: MetadataOp,
    ) -> Result<Vec<Entity>, EngramError> {
        if filter.is_empty() {
            return Err(EngramError::BadArgument(
                "bulk update filter must contain at least one criterion \
                 (type, name_contains, description_contains)"
                    .into(),
            ));
        }

        let mut graph = self.graph().write();

        let matched_ids: Vec<String> = graph
            .entities
            .values()
            .filter(|entity| filter.matches(entity))
            .map(|entity| entity.id.clone())
            .collect();
        if matched_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pre_images: Vec<(String, Option<Metadata>)> = Vec::with_capacity(matched_ids.len());
        let mut updated = Vec::with_capacity(matched_ids.len());
        let mut first_error = None;

        'apply: for id in &matched_ids {
            let entity = match graph.entities.get_mut(id) {
                Some(entity) => entity,
                None => continue,
            };
            if entity.metadata.is_none() && op == MetadataOp::Delete {
                updated.push(entity.clone());
                continue;
            }

            pre_images.push((id.clone(), entity.metadata.clone()));
            let metadata = entity.metadata.get_or_insert_with(Metadata::new);
            for (path, value) in updates {
                if let Err(err) = set_nested_value(metadata, path, value, op) {
                    first_error = Some(EngramError::BadArgument(format!(
                        "failed updating path '{path}' for entity {id}: {err}"
                    )));
                    break 'apply;
                }
            }
            updated.push(entity.clone());
        }

        if let Some(err) = first_error {
            for (id, pre_image) in pre_images {
                if let Some(entity) = graph.entities.get_mut(&id) {
                    entity.metadata = pre_image;
                }
            }
            return Err(err);
        }
        drop(graph);

        self.persist_or_rollback(move |graph| {
            for (id, pre_image) in pre_images {
                if let Some(entity) = graph.entities.get_mut(&id) {
                    entity.metadata = pre_image;
                }
            }
        })?;
        Ok(updated)
    }
}

// =============================================================================
// TESTS
// =============================================================================
