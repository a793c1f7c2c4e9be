//! # engram-core
//!
//! A persistent, in-process knowledge-graph store.
//!
//! Engram records three kinds of records — entities (nodes), relations
//! (directed edges with metadata) and observations (time-stamped facts
//! about an entity) — and exposes a rich query surface on top of them:
//! structured filter/sort/paginate queries, BFS/DFS traversal, subgraph
//! extraction within a radius, simple-path enumeration, chronological
//! observation timelines, and dot-path metadata mutation with
//! transactional rollback.
//!
//! Every mutating operation is durably persisted to a single on-disk
//! JSON document before it is reported as successful; a store opened
//! with an empty path is in-memory-only.
//!
//! ## Concurrency
//!
//! One reader-writer lock guards all three collections. Writes follow a
//! three-phase discipline: validate and mutate under the write lock,
//! persist outside it, and roll the in-memory state back if the save
//! fails. Reads hold the read lock for their full duration and copy
//! results out.

// =============================================================================
// MODULES
// =============================================================================

pub mod compare;
pub mod extract;
pub mod metadata;
pub mod persistence;
pub mod query;
pub mod search;
pub mod store;
pub mod timeline;
pub mod traversal;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Entity, EngramError, EntityFilter, GraphDocument, GraphProjection, Metadata, Observation,
    Relation,
};

// =============================================================================
// RE-EXPORTS: Store & Engines
// =============================================================================

pub use metadata::MetadataOp;
pub use query::{
    Filter, FilterOperator, QueryInput, QueryOutput, QueryResults, QueryTarget, SortOrder,
};
pub use store::GraphStore;
pub use traversal::{
    FilterCondition, GraphAccessor, NodeFilter, Path, PathParams, PathSegment, RelationFilter,
    SubgraphParams, TraversalAlgorithm, TraversalFilters, TraverseParams, TraverseResult,
};
