//! # Graph Store
//!
//! The stateful core: three record collections behind a single
//! reader-writer lock, identifier generation, and the persistence
//! discipline every mutation follows.
//!
//! ## Write discipline
//!
//! Every mutating operation runs three phases:
//!
//! 1. acquire the write lock, validate **all** inputs, mutate in memory
//! 2. release the lock, persist the document to disk
//! 3. on persistence failure, re-acquire the lock, restore the pre-image,
//!    and surface a `Persistence` error
//!
//! Disk I/O therefore never happens inside the critical section. A reader
//! interleaved between phase 2 and a failing save may observe state that
//! is subsequently rolled back; every state that survives is one that was
//! successfully persisted.

use crate::persistence;
use crate::types::{Entity, EngramError, GraphDocument, GraphProjection, Metadata, Observation, Relation};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::PathBuf;
use uuid::Uuid;

/// Generate a fresh record identifier: a random 128-bit value in the
/// standard hyphenated rendering.
#[must_use]
pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// GRAPH STORE
// =============================================================================

/// The persistent knowledge-graph store.
///
/// All state lives inside the instance; the only configuration is the
/// document path. With no path the store is in-memory-only (used by
/// tests), and every save is a no-op.
#[derive(Debug)]
pub struct GraphStore {
    path: Option<PathBuf>,
    graph: RwLock<GraphDocument>,
}

impl GraphStore {
    /// Open a store backed by the document at `path`, loading any
    /// existing document. A missing file starts an empty graph; a
    /// malformed one is a fatal `Persistence` error. An empty path means
    /// in-memory-only mode.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngramError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Ok(Self::in_memory());
        }
        let document = persistence::load_document(&path)?;
        Ok(Self {
            path: Some(path),
            graph: RwLock::new(document),
        })
    }

    /// Create a store with no backing file.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            graph: RwLock::new(GraphDocument::new()),
        }
    }

    /// Shared read access to the document for the algorithm modules.
    pub(crate) fn graph(&self) -> &RwLock<GraphDocument> {
        &self.graph
    }

    // =========================================================================
    // PERSISTENCE DISCIPLINE
    // =========================================================================

    /// Serialize under the read lock, write outside any lock.
    pub(crate) fn persist(&self) -> Result<(), EngramError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = {
            let graph = self.graph.read();
            persistence::document_to_bytes(&graph)?
        };
        persistence::write_document(path, &bytes)?;
        tracing::debug!(path = %path.display(), "graph document saved");
        Ok(())
    }

    /// Persist the document; on failure re-acquire the write lock, apply
    /// `rollback`, and return the save error.
    pub(crate) fn persist_or_rollback(
        &self,
        rollback: impl FnOnce(&mut GraphDocument),
    ) -> Result<(), EngramError> {
        match self.persist() {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "document save failed, rolling back in-memory mutation");
                let mut graph = self.graph.write();
                rollback(&mut graph);
                Err(err)
            }
        }
    }

    // =========================================================================
    // ENTITY OPERATIONS
    // =========================================================================

    /// Create entities in bulk, filling in missing ids.
    ///
    /// Any duplicate id — within the input batch or against existing
    /// records — fails the whole call with `Conflict` before anything is
    /// applied.
    pub fn create_entities(&self, entities: Vec<Entity>) -> Result<Vec<Entity>, EngramError> {
        let mut graph = self.graph.write();

        let mut created = Vec::with_capacity(entities.len());
        let mut batch_ids = BTreeSet::new();
        for mut entity in entities {
            if entity.id.is_empty() {
                entity.id = generate_id();
            }
            if graph.entities.contains_key(&entity.id) || !batch_ids.insert(entity.id.clone()) {
                return Err(EngramError::Conflict(format!(
                    "entity with id {} already exists",
                    entity.id
                )));
            }
            created.push(entity);
        }

        for entity in &created {
            graph.entities.insert(entity.id.clone(), entity.clone());
        }
        drop(graph);

        self.persist_or_rollback(|graph| {
            for entity in &created {
                graph.entities.remove(&entity.id);
            }
        })?;
        Ok(created)
    }

    /// Apply partial updates to existing entities in batch.
    ///
    /// `type`, `name` and `description` are replaced when the patch
    /// carries a non-empty value and preserved otherwise (so this path
    /// cannot empty a field); `metadata` is shallow-merged.
    pub fn update_entities(&self, patches: Vec<Entity>) -> Result<Vec<Entity>, EngramError> {
        let mut graph = self.graph.write();

        for (i, patch) in patches.iter().enumerate() {
            if patch.id.is_empty() {
                return Err(EngramError::BadArgument(format!(
                    "entity patch at index {i} is missing the required id"
                )));
            }
            if !graph.entities.contains_key(&patch.id) {
                return Err(EngramError::NotFound(format!(
                    "entity with id {} does not exist",
                    patch.id
                )));
            }
        }

        let mut originals = Vec::new();
        let mut updated = Vec::with_capacity(patches.len());
        for patch in patches {
            let entity = graph.entities.get_mut(&patch.id).ok_or_else(|| {
                EngramError::Internal("entity vanished between validation and update".into())
            })?;
            // Capture the pre-image only once per id, so a repeated patch
            // still rolls back to the true original.
            if !originals.iter().any(|e: &Entity| e.id == patch.id) {
                originals.push(entity.clone());
            }

            if !patch.entity_type.is_empty() {
                entity.entity_type = patch.entity_type;
            }
            if !patch.name.is_empty() {
                entity.name = patch.name;
            }
            if !patch.description.is_empty() {
                entity.description = patch.description;
            }
            if let Some(patch_metadata) = patch.metadata {
                let metadata = entity.metadata.get_or_insert_with(Metadata::new);
                for (key, value) in patch_metadata {
                    metadata.insert(key, value);
                }
            }
            updated.push(entity.clone());
        }
        drop(graph);

        self.persist_or_rollback(|graph| {
            for original in &originals {
                graph.entities.insert(original.id.clone(), original.clone());
            }
        })?;
        Ok(updated)
    }

    /// Delete entities by id.
    ///
    /// Every listed id must exist; a missing one aborts with `NotFound`
    /// before any deletion is applied. Deletion does not cascade to
    /// relations or observations referencing the entity.
    pub fn delete_entities(&self, ids: &[String]) -> Result<(), EngramError> {
        let mut graph = self.graph.write();

        for id in ids {
            if !graph.entities.contains_key(id) {
                return Err(EngramError::NotFound(format!(
                    "entity with id {id} does not exist"
                )));
            }
        }

        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = graph.entities.remove(id) {
                removed.push(entity);
            }
        }
        drop(graph);

        self.persist_or_rollback(|graph| {
            for entity in &removed {
                graph.entities.insert(entity.id.clone(), entity.clone());
            }
        })
    }

    // =========================================================================
    // RELATION OPERATIONS
    // =========================================================================

    /// Create relations in bulk, filling in missing ids.
    ///
    /// Both endpoints of every relation must name existing entities.
    pub fn create_relations(&self, relations: Vec<Relation>) -> Result<Vec<Relation>, EngramError> {
        let mut graph = self.graph.write();

        let mut created = Vec::with_capacity(relations.len());
        let mut batch_ids = BTreeSet::new();
        for mut relation in relations {
            if relation.id.is_empty() {
                relation.id = generate_id();
            }
            if graph.relations.contains_key(&relation.id) || !batch_ids.insert(relation.id.clone())
            {
                return Err(EngramError::Conflict(format!(
                    "relation with id {} already exists",
                    relation.id
                )));
            }
            if !graph.entities.contains_key(&relation.source) {
                return Err(EngramError::Invariant(format!(
                    "source entity {} does not exist",
                    relation.source
                )));
            }
            if !graph.entities.contains_key(&relation.target) {
                return Err(EngramError::Invariant(format!(
                    "target entity {} does not exist",
                    relation.target
                )));
            }
            created.push(relation);
        }

        for relation in &created {
            graph.relations.insert(relation.id.clone(), relation.clone());
        }
        drop(graph);

        self.persist_or_rollback(|graph| {
            for relation in &created {
                graph.relations.remove(&relation.id);
            }
        })?;
        Ok(created)
    }

    /// Delete relations by match spec.
    ///
    /// A spec with a non-empty id matches that id; otherwise it matches
    /// structurally on `(source, target, type)`. Specs that match nothing
    /// are silently tolerated.
    pub fn delete_relations(&self, specs: &[Relation]) -> Result<(), EngramError> {
        let mut graph = self.graph.write();

        let mut removed = Vec::new();
        graph.relations.retain(|id, relation| {
            let matched = specs.iter().any(|spec| {
                if spec.id.is_empty() {
                    relation.source == spec.source
                        && relation.target == spec.target
                        && relation.relation_type == spec.relation_type
                } else {
                    *id == spec.id
                }
            });
            if matched {
                removed.push(relation.clone());
            }
            !matched
        });
        drop(graph);

        self.persist_or_rollback(|graph| {
            for relation in &removed {
                graph.relations.insert(relation.id.clone(), relation.clone());
            }
        })
    }

    // =========================================================================
    // OBSERVATION OPERATIONS
    // =========================================================================

    /// Add observations in bulk, filling in missing ids and stamping the
    /// wall clock where no timestamp was supplied.
    pub fn add_observations(
        &self,
        observations: Vec<Observation>,
    ) -> Result<Vec<Observation>, EngramError> {
        let mut graph = self.graph.write();

        let mut created = Vec::with_capacity(observations.len());
        let mut batch_ids = BTreeSet::new();
        for mut observation in observations {
            if observation.id.is_empty() {
                observation.id = generate_id();
            }
            if observation.timestamp.is_none() {
                observation.timestamp = Some(Utc::now());
            }
            if graph.observations.contains_key(&observation.id)
                || !batch_ids.insert(observation.id.clone())
            {
                return Err(EngramError::Conflict(format!(
                    "observation with id {} already exists",
                    observation.id
                )));
            }
            if !graph.entities.contains_key(&observation.entity_id) {
                return Err(EngramError::NotFound(format!(
                    "entity {} does not exist",
                    observation.entity_id
                )));
            }
            created.push(observation);
        }

        for observation in &created {
            graph
                .observations
                .insert(observation.id.clone(), observation.clone());
        }
        drop(graph);

        self.persist_or_rollback(|graph| {
            for observation in &created {
                graph.observations.remove(&observation.id);
            }
        })?;
        Ok(created)
    }

    /// Delete observations by id, validating the whole list first.
    pub fn delete_observations(&self, ids: &[String]) -> Result<(), EngramError> {
        let mut graph = self.graph.write();

        for id in ids {
            if !graph.observations.contains_key(id) {
                return Err(EngramError::NotFound(format!(
                    "observation with id {id} does not exist"
                )));
            }
        }

        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(observation) = graph.observations.remove(id) {
                removed.push(observation);
            }
        }
        drop(graph);

        self.persist_or_rollback(|graph| {
            for observation in &removed {
                graph
                    .observations
                    .insert(observation.id.clone(), observation.clone());
            }
        })
    }

    // =========================================================================
    // READ OPERATIONS
    // =========================================================================

    /// Snapshot of all three collections.
    #[must_use]
    pub fn read_document(&self) -> GraphDocument {
        self.graph.read().clone()
    }

    /// Project the named entities plus every relation whose source or
    /// target is in the set.
    pub fn open_nodes(&self, ids: &[String]) -> Result<GraphProjection, EngramError> {
        if ids.is_empty() {
            return Err(EngramError::BadArgument(
                "at least one entity id must be provided".into(),
            ));
        }

        let mut id_set = BTreeSet::new();
        for id in ids {
            if id.is_empty() {
                return Err(EngramError::BadArgument("entity id cannot be empty".into()));
            }
            id_set.insert(id.as_str());
        }

        let graph = self.graph.read();

        let mut projection = GraphProjection::default();
        for id in &id_set {
            let entity = graph.entities.get(*id).ok_or_else(|| {
                EngramError::NotFound(format!("entity with id '{id}' not found"))
            })?;
            projection
                .entities
                .insert(entity.id.clone(), entity.clone());
        }

        for (id, relation) in &graph.relations {
            if id_set.contains(relation.source.as_str()) || id_set.contains(relation.target.as_str())
            {
                projection.relations.insert(id.clone(), relation.clone());
            }
        }

        Ok(projection)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, name: &str) -> Entity {
        Entity {
            id: id.into(),
            entity_type: "person".into(),
            name: name.into(),
            ..Entity::default()
        }
    }

    #[test]
    fn create_entities_fills_missing_ids() {
        let store = GraphStore::in_memory();
        let created = store
            .create_entities(vec![Entity {
                entity_type: "person".into(),
                name: "Ada".into(),
                ..Entity::default()
            }])
            .expect("create");

        assert_eq!(created.len(), 1);
        assert!(!created[0].id.is_empty());
        assert!(store.read_document().entities.contains_key(&created[0].id));
    }

    #[test]
    fn create_entities_duplicate_id_conflicts_without_partial_effect() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada")])
            .expect("create");

        let result =
            store.create_entities(vec![entity("e2", "Grace"), entity("e1", "Shadow")]);
        assert!(matches!(result, Err(EngramError::Conflict(_))));
        // The batch failed as a whole: e2 must not have been applied.
        assert!(!store.read_document().entities.contains_key("e2"));
    }

    #[test]
    fn update_entities_patches_fields_and_merges_metadata() {
        let store = GraphStore::in_memory();
        let mut original = entity("e1", "Ada");
        original.metadata = Some(
            serde_json::from_value(serde_json::json!({"city": "London", "age": 36}))
                .expect("metadata"),
        );
        store.create_entities(vec![original]).expect("create");

        let mut patch = Entity {
            id: "e1".into(),
            name: "Ada Lovelace".into(),
            ..Entity::default()
        };
        patch.metadata = Some(
            serde_json::from_value(serde_json::json!({"city": "Turin"})).expect("metadata"),
        );

        let updated = store.update_entities(vec![patch]).expect("update");
        assert_eq!(updated[0].name, "Ada Lovelace");
        // Empty patch fields preserve the existing values.
        assert_eq!(updated[0].entity_type, "person");

        let metadata = updated[0].metadata.as_ref().expect("metadata");
        assert_eq!(metadata["city"], serde_json::json!("Turin"));
        assert_eq!(metadata["age"], serde_json::json!(36));
    }

    #[test]
    fn update_entities_missing_id_and_unknown_id() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada")])
            .expect("create");

        let missing_id = store.update_entities(vec![Entity::default()]);
        assert!(matches!(missing_id, Err(EngramError::BadArgument(_))));

        let unknown = store.update_entities(vec![entity("ghost", "x")]);
        assert!(matches!(unknown, Err(EngramError::NotFound(_))));
    }

    #[test]
    fn delete_entities_validates_before_applying() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada"), entity("e2", "Grace")])
            .expect("create");

        let result = store.delete_entities(&["e1".into(), "ghost".into()]);
        assert!(matches!(result, Err(EngramError::NotFound(_))));
        // e1 preceded the missing id but must still be present.
        assert!(store.read_document().entities.contains_key("e1"));

        store
            .delete_entities(&["e1".into(), "e2".into()])
            .expect("delete");
        assert!(store.read_document().entities.is_empty());
    }

    #[test]
    fn entity_deletion_does_not_cascade() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada"), entity("e2", "Grace")])
            .expect("create");
        store
            .create_relations(vec![Relation {
                id: "r1".into(),
                relation_type: "knows".into(),
                source: "e1".into(),
                target: "e2".into(),
                ..Relation::default()
            }])
            .expect("relate");

        store.delete_entities(&["e2".into()]).expect("delete");

        // The relation now dangles; that is the documented behavior.
        assert!(store.read_document().relations.contains_key("r1"));
    }

    #[test]
    fn create_relations_requires_existing_endpoints() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada")])
            .expect("create");

        let result = store.create_relations(vec![Relation {
            relation_type: "knows".into(),
            source: "e1".into(),
            target: "e3".into(),
            ..Relation::default()
        }]);

        assert!(matches!(result, Err(EngramError::Invariant(_))));
        assert!(store.read_document().relations.is_empty());
    }

    #[test]
    fn delete_relations_matches_by_id_or_structure() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada"), entity("e2", "Grace")])
            .expect("create");
        store
            .create_relations(vec![
                Relation {
                    id: "r1".into(),
                    relation_type: "knows".into(),
                    source: "e1".into(),
                    target: "e2".into(),
                    ..Relation::default()
                },
                Relation {
                    id: "r2".into(),
                    relation_type: "mentors".into(),
                    source: "e1".into(),
                    target: "e2".into(),
                    ..Relation::default()
                },
            ])
            .expect("relate");

        // Structural match, id left empty.
        store
            .delete_relations(&[Relation {
                relation_type: "knows".into(),
                source: "e1".into(),
                target: "e2".into(),
                ..Relation::default()
            }])
            .expect("delete");
        // Non-matching spec is silently tolerated.
        store
            .delete_relations(&[Relation {
                id: "no-such-relation".into(),
                ..Relation::default()
            }])
            .expect("delete");

        let document = store.read_document();
        assert!(!document.relations.contains_key("r1"));
        assert!(document.relations.contains_key("r2"));
    }

    #[test]
    fn add_observations_stamps_missing_timestamps() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada")])
            .expect("create");

        let created = store
            .add_observations(vec![Observation {
                entity_id: "e1".into(),
                observation_type: "log".into(),
                content: "started".into(),
                ..Observation::default()
            }])
            .expect("add");

        assert!(created[0].timestamp.is_some());
    }

    #[test]
    fn add_observations_requires_existing_entity() {
        let store = GraphStore::in_memory();

        let result = store.add_observations(vec![Observation {
            entity_id: "ghost".into(),
            observation_type: "log".into(),
            content: "x".into(),
            ..Observation::default()
        }]);

        assert!(matches!(result, Err(EngramError::NotFound(_))));
    }

    #[test]
    fn delete_observations_validates_before_applying() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada")])
            .expect("create");
        store
            .add_observations(vec![
                Observation {
                    id: "o1".into(),
                    entity_id: "e1".into(),
                    observation_type: "log".into(),
                    content: "a".into(),
                    ..Observation::default()
                },
                Observation {
                    id: "o2".into(),
                    entity_id: "e1".into(),
                    observation_type: "log".into(),
                    content: "b".into(),
                    ..Observation::default()
                },
            ])
            .expect("add");

        let result = store.delete_observations(&["o1".into(), "ghost".into()]);
        assert!(matches!(result, Err(EngramError::NotFound(_))));
        assert!(store.read_document().observations.contains_key("o1"));

        store
            .delete_observations(&["o1".into(), "o2".into()])
            .expect("delete");
        assert!(store.read_document().observations.is_empty());
    }

    #[test]
    fn open_nodes_projects_entities_and_touching_relations() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "Ada"), entity("e2", "Grace"), entity("e3", "Acme")])
            .expect("create");
        store
            .create_relations(vec![
                Relation {
                    id: "r1".into(),
                    relation_type: "knows".into(),
                    source: "e1".into(),
                    target: "e2".into(),
                    ..Relation::default()
                },
                Relation {
                    id: "r2".into(),
                    relation_type: "works_at".into(),
                    source: "e2".into(),
                    target: "e3".into(),
                    ..Relation::default()
                },
            ])
            .expect("relate");

        let projection = store.open_nodes(&["e1".into()]).expect("open");
        assert_eq!(projection.entities.len(), 1);
        // r1 touches e1; r2 does not.
        assert!(projection.relations.contains_key("r1"));
        assert!(!projection.relations.contains_key("r2"));
    }

    #[test]
    fn open_nodes_argument_checks() {
        let store = GraphStore::in_memory();

        assert!(matches!(
            store.open_nodes(&[]),
            Err(EngramError::BadArgument(_))
        ));
        assert!(matches!(
            store.open_nodes(&[String::new()]),
            Err(EngramError::BadArgument(_))
        ));
        assert!(matches!(
            store.open_nodes(&["ghost".into()]),
            Err(EngramError::NotFound(_))
        ));
    }

    #[test]
    fn empty_path_means_in_memory_mode() {
        let store = GraphStore::open("").expect("open");
        store
            .create_entities(vec![entity("e1", "Ada")])
            .expect("create");
        assert_eq!(store.read_document().entities.len(), 1);
    }

    #[test]
    fn generated_ids_are_hyphenated_hex() {
        let id = generate_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }
}
