//! # Field Extraction
//!
//! Resolves a dotted field path against a record, yielding the value or a
//! distinguished "field absent" signal.
//!
//! The `metadata.` prefix is stripped and the remainder used as a
//! *single* top-level metadata key: `metadata.x.y` looks up the literal
//! key `"x.y"`. The metadata mutator interprets the same string as nested
//! traversal; that asymmetry is deliberate and documented.
//!
//! Result contract:
//! - `Ok(Some(value))` — the field is present
//! - `Ok(None)` — a `metadata.*` key is absent (reported to the query
//!   engine as a non-match, not an error)
//! - `Err(BadArgument)` — any other field is unknown for the family

use crate::EngramError;
use crate::types::{Entity, Metadata, Observation, Relation};
use serde_json::Value;

/// Prefix routing a field path into the metadata map.
const METADATA_PREFIX: &str = "metadata.";

fn metadata_key(metadata: Option<&Metadata>, key: &str) -> Option<Value> {
    metadata.and_then(|m| m.get(key).cloned())
}

// =============================================================================
// PER-FAMILY EXTRACTORS
// =============================================================================

/// Extract a field from an entity.
///
/// Recognized top-level fields: `id`, `type`, `name`, `description`.
pub fn entity_field(entity: &Entity, field: &str) -> Result<Option<Value>, EngramError> {
    match field {
        "id" => Ok(Some(Value::String(entity.id.clone()))),
        "type" => Ok(Some(Value::String(entity.entity_type.clone()))),
        "name" => Ok(Some(Value::String(entity.name.clone()))),
        "description" => Ok(Some(Value::String(entity.description.clone()))),
        _ => {
            if let Some(key) = field.strip_prefix(METADATA_PREFIX) {
                return Ok(metadata_key(entity.metadata.as_ref(), key));
            }
            Err(EngramError::BadArgument(format!(
                "unknown entity field: {field}"
            )))
        }
    }
}

/// Extract a field from a relation.
///
/// Recognized top-level fields: `id`, `type`, `source`, `target`.
pub fn relation_field(relation: &Relation, field: &str) -> Result<Option<Value>, EngramError> {
    match field {
        "id" => Ok(Some(Value::String(relation.id.clone()))),
        "type" => Ok(Some(Value::String(relation.relation_type.clone()))),
        "source" => Ok(Some(Value::String(relation.source.clone()))),
        "target" => Ok(Some(Value::String(relation.target.clone()))),
        _ => {
            if let Some(key) = field.strip_prefix(METADATA_PREFIX) {
                return Ok(metadata_key(relation.metadata.as_ref(), key));
            }
            Err(EngramError::BadArgument(format!(
                "unknown relation field: {field}"
            )))
        }
    }
}

/// Extract a field from an observation.
///
/// All declared fields are reachable, including `timestamp` (rendered as
/// an RFC 3339 string) and `tags`.
pub fn observation_field(
    observation: &Observation,
    field: &str,
) -> Result<Option<Value>, EngramError> {
    match field {
        "id" => Ok(Some(Value::String(observation.id.clone()))),
        "entity_id" => Ok(Some(Value::String(observation.entity_id.clone()))),
        "type" => Ok(Some(Value::String(observation.observation_type.clone()))),
        "content" => Ok(Some(Value::String(observation.content.clone()))),
        "description" => Ok(Some(Value::String(observation.description.clone()))),
        "timestamp" => Ok(Some(match observation.timestamp {
            Some(ts) => Value::String(ts.to_rfc3339()),
            None => Value::Null,
        })),
        "tags" => Ok(Some(Value::Array(
            observation
                .tags
                .iter()
                .map(|t| Value::String(t.clone()))
                .collect(),
        ))),
        _ => {
            if let Some(key) = field.strip_prefix(METADATA_PREFIX) {
                return Ok(metadata_key(observation.metadata.as_ref(), key));
            }
            Err(EngramError::BadArgument(format!(
                "unknown observation field: {field}"
            )))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
