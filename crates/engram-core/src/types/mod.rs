//! # Core Type Definitions
//!
//! This module contains all record types for the Engram knowledge-graph
//! substrate:
//! - The three record families (`Entity`, `Relation`, `Observation`)
//! - The persisted document (`GraphDocument`) and projections
//! - The bulk-update filter (`EntityFilter`)
//! - Error types (`EngramError`)
//!
//! ## Determinism Guarantees
//!
//! Collections are `BTreeMap` keyed by record id, so iteration order (and
//! therefore serialized output, search order, and traversal neighbor
//! order) is stable across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Free-form metadata attached to a record.
///
/// Values are arbitrary JSON trees; comparison and mutation operate on
/// this representation directly.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// RECORD FAMILIES
// =============================================================================

/// A node in the knowledge graph.
///
/// Identifiers are opaque non-empty strings, unique across entities. A
/// caller may supply one at creation; the store generates a v4 UUID
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A directed edge between two entities.
///
/// `source` and `target` must name existing entities at creation time.
/// `bidirectional` is stored and serialized but never consulted by the
/// traversal algorithms; the default neighbor policy is already
/// undirected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub relation_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bidirectional: bool,
}

/// A time-stamped fact about an entity.
///
/// An absent `timestamp` at creation is filled with the wall clock;
/// stored observations always carry one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub entity_id: String,
    #[serde(rename = "type", default)]
    pub observation_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

fn is_zero(weight: &f64) -> bool {
    *weight == 0.0
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

// =============================================================================
// DOCUMENT & PROJECTIONS
// =============================================================================

/// The persisted form of the whole graph: three keyed collections,
/// serialized as one JSON object. Missing top-level keys load as empty
/// maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub entities: BTreeMap<String, Entity>,
    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
    #[serde(default)]
    pub observations: BTreeMap<String, Observation>,
}

impl GraphDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// A selective view of the graph: a set of entities plus the relations
/// touching them. Returned by open-nodes and subgraph extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphProjection {
    #[serde(default)]
    pub entities: BTreeMap<String, Entity>,
    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
}

// =============================================================================
// BULK-UPDATE FILTER
// =============================================================================

/// Coarse entity filter for bulk metadata updates.
///
/// All substring matches are case-sensitive. At least one criterion must
/// be non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilter {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_contains: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description_contains: String,
}

impl EntityFilter {
    /// True when no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_type.is_empty()
            && self.name_contains.is_empty()
            && self.description_contains.is_empty()
    }

    /// Check an entity against every non-empty criterion.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        if !self.entity_type.is_empty() && entity.entity_type != self.entity_type {
            return false;
        }
        if !self.name_contains.is_empty() && !entity.name.contains(&self.name_contains) {
            return false;
        }
        if !self.description_contains.is_empty()
            && !entity.description.contains(&self.description_contains)
        {
            return false;
        }
        true
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the graph store.
///
/// - No silent failures: every fallible operation returns
///   `Result<T, EngramError>`
/// - Every error is fatal to the current call; no partial success is
///   reported
/// - The store never panics on well-typed input
#[derive(Debug, Error)]
pub enum EngramError {
    /// Malformed or missing required input (empty id, missing filter
    /// criterion, nested-into-non-map path, negative radius).
    #[error("invalid argument: {0}")]
    BadArgument(String),

    /// A named record or start node does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Attempt to create a record whose id already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A structural invariant would be broken, e.g. a relation referring
    /// to a non-existent endpoint at creation.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Serialization or write failure on the document. Always preceded by
    /// an in-memory rollback attempt.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Unexpected invariant break; a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

// =============================================================================
// TESTS
// =============================================================================
