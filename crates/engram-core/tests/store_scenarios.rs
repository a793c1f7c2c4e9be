//! # End-to-End Store Scenarios
//!
//! Exercises the full store surface the way an external caller drives
//! it: persistence round-trips, relation invariants, structured queries,
//! timelines, traversal, path finding, and metadata mutation with
//! rollback.

use engram_core::{
    Entity, EngramError, EntityFilter, Filter, FilterOperator, GraphStore, Metadata, MetadataOp,
    Observation, PathParams, PathSegment, QueryInput, QueryResults, QueryTarget, Relation,
    SortOrder, TraversalAlgorithm, TraverseParams,
};
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn as_map(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

fn entity(id: &str, entity_type: &str, name: &str) -> Entity {
    Entity {
        id: id.into(),
        entity_type: entity_type.into(),
        name: name.into(),
        ..Entity::default()
    }
}

fn relation(id: &str, relation_type: &str, source: &str, target: &str) -> Relation {
    Relation {
        id: id.into(),
        relation_type: relation_type.into(),
        source: source.into(),
        target: target.into(),
        ..Relation::default()
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

mod persistence {
    use super::*;

    #[test]
    fn round_trip_through_a_fresh_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");

        {
            let store = GraphStore::open(&path).expect("open");
            store
                .create_entities(vec![entity("e1", "person", "John Doe")])
                .expect("create");
        }

        let reopened = GraphStore::open(&path).expect("reopen");
        let document = reopened.read_document();
        assert_eq!(document.entities.len(), 1);
        assert_eq!(
            document.entities["e1"],
            entity("e1", "person", "John Doe")
        );
    }

    #[test]
    fn every_successful_write_is_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");

        let store = GraphStore::open(&path).expect("open");
        store
            .create_entities(vec![entity("e1", "person", "Ada"), entity("e2", "person", "Grace")])
            .expect("create");
        store
            .create_relations(vec![relation("r1", "knows", "e1", "e2")])
            .expect("relate");
        store.delete_entities(&["e2".into()]).expect("delete");

        let on_disk = GraphStore::open(&path).expect("reopen").read_document();
        assert_eq!(on_disk, store.read_document());
    }

    #[test]
    fn failed_save_rolls_the_mutation_back() {
        // The parent directory does not exist, so loads see an empty
        // graph but every save fails.
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing-subdir").join("memory.json");

        let store = GraphStore::open(&path).expect("open");
        let result = store.create_entities(vec![entity("e1", "person", "Ada")]);

        assert!(matches!(result, Err(EngramError::Persistence(_))));
        assert!(store.read_document().entities.is_empty());
    }

    #[test]
    fn created_entities_and_relations_are_keyed_by_id() {
        let store = GraphStore::in_memory();
        let entities = vec![
            entity("a", "person", "A"),
            entity("b", "person", "B"),
            entity("c", "person", "C"),
        ];
        let relations = vec![
            relation("ab", "knows", "a", "b"),
            relation("bc", "knows", "b", "c"),
        ];
        store.create_entities(entities.clone()).expect("create");
        store.create_relations(relations.clone()).expect("relate");

        let document = store.read_document();
        for e in &entities {
            assert_eq!(document.entities.get(&e.id), Some(e));
        }
        for r in &relations {
            assert_eq!(document.relations.get(&r.id), Some(r));
        }
    }
}

// =============================================================================
// RELATION INVARIANTS
// =============================================================================

mod relations {
    use super::*;

    #[test]
    fn dangling_endpoint_is_rejected_with_no_partial_effect() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("e1", "person", "Ada")])
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
}

// =============================================================================
// STRUCTURED QUERY
// =============================================================================

mod query {
    use super::*;

    #[test]
    fn filtered_sorted_paginated_query() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![
                Entity {
                    metadata: Some(as_map(json!({"city": "New York", "age": 30}))),
                    ..entity("e1", "Person", "e1")
                },
                Entity {
                    metadata: Some(as_map(json!({"city": "London", "age": 25}))),
                    ..entity("e2", "Person", "e2")
                },
                Entity {
                    metadata: Some(as_map(json!({"city": "New York"}))),
                    ..entity("e3", "Company", "e3")
                },
                Entity {
                    metadata: Some(as_map(json!({"city": "New York", "age": 35}))),
                    ..entity("e4", "Person", "e4")
                },
            ])
            .expect("create");

        let output = store
            .query(&QueryInput {
                filters: vec![
                    Filter {
                        field: "type".into(),
                        operator: FilterOperator::Eq,
                        value: json!("Person"),
                    },
                    Filter {
                        field: "metadata.city".into(),
                        operator: FilterOperator::Eq,
                        value: json!("New York"),
                    },
                ],
                sort_by: "metadata.age".into(),
                sort_order: SortOrder::Desc,
                limit: 1,
                offset: 1,
                target_type: QueryTarget::Entity,
            })
            .expect("query");

        assert_eq!(output.total, 2);
        match &output.results {
            QueryResults::Entities(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].id, "e1");
            }
            QueryResults::Relations(_) => panic!("expected entities"),
        }
    }
}

// =============================================================================
// TIMELINE
// =============================================================================

mod timeline {
    use super::*;

    #[test]
    fn type_and_tag_filtered_timeline() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![entity("E", "service", "api")])
            .expect("create");
        store
            .add_observations(vec![
                Observation {
                    id: "o1".into(),
                    entity_id: "E".into(),
                    observation_type: "log".into(),
                    content: "o1".into(),
                    timestamp: Some("2024-05-01T10:00:00Z".parse().expect("ts")),
                    tags: vec!["system".into(), "info".into()],
                    ..Observation::default()
                },
                Observation {
                    id: "o2".into(),
                    entity_id: "E".into(),
                    observation_type: "event".into(),
                    content: "o2".into(),
                    timestamp: Some("2024-05-01T12:00:00Z".parse().expect("ts")),
                    tags: vec!["critical".into(), "alert".into()],
                    ..Observation::default()
                },
                Observation {
                    id: "o5".into(),
                    entity_id: "E".into(),
                    observation_type: "event".into(),
                    content: "o5".into(),
                    timestamp: Some("2024-05-03T09:00:00Z".parse().expect("ts")),
                    tags: vec!["info".into()],
                    ..Observation::default()
                },
            ])
            .expect("add");

        let timeline = store
            .entity_timeline("E", None, None, "event", &["info".into()])
            .expect("timeline");

        let ids: Vec<_> = timeline.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o5"]);
    }
}

// =============================================================================
// TRAVERSAL & PATHS
// =============================================================================

mod traversal {
    use super::*;

    fn seeded_store() -> GraphStore {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![
                entity("A", "person", "A"),
                entity("B", "person", "B"),
                entity("C", "person", "C"),
                entity("Acme", "company", "Acme"),
                entity("CityA", "city", "CityA"),
            ])
            .expect("create");
        store
            .create_relations(vec![
                relation("r1", "knows", "A", "B"),
                relation("r2", "knows", "A", "C"),
                relation("r3", "works_at", "B", "Acme"),
                relation("r4", "knows", "C", "B"),
                relation("r5", "located_in", "Acme", "CityA"),
            ])
            .expect("relate");
        store
    }

    #[test]
    fn undirected_bfs_at_depth_one() {
        let store = seeded_store();
        let result = store
            .traverse(&TraverseParams {
                start_ids: vec!["A".into()],
                algorithm: TraversalAlgorithm::Bfs,
                max_depth: 1,
                filters: None,
            })
            .expect("traverse");

        let ids: BTreeSet<_> = result.visited_depths.keys().map(String::as_str).collect();
        assert_eq!(ids, BTreeSet::from(["A", "B", "C"]));
        assert_eq!(result.visited_depths["A"], 0);
        assert_eq!(result.visited_depths["B"], 1);
        assert_eq!(result.visited_depths["C"], 1);
    }

    #[test]
    fn directed_path_enumeration() {
        let store = seeded_store();
        let paths = store
            .find_paths(&PathParams {
                start_id: "A".into(),
                end_id: "CityA".into(),
                max_length: -1,
                filters: None,
            })
            .expect("paths");

        assert_eq!(paths.len(), 2);
        for path in &paths {
            // Alternating entity/relation/entity, endpoints linked by the
            // intervening relation.
            assert!(path.len() % 2 == 1);
            for window in path.windows(3).step_by(2) {
                match (&window[0], &window[1], &window[2]) {
                    (
                        PathSegment::Entity(prev),
                        PathSegment::Relation(rel),
                        PathSegment::Entity(next),
                    ) => {
                        assert_eq!(rel.source, prev.id);
                        assert_eq!(rel.target, next.id);
                    }
                    _ => panic!("path does not alternate"),
                }
            }
            let entity_ids: Vec<_> = path
                .iter()
                .filter_map(|segment| match segment {
                    PathSegment::Entity(e) => Some(e.id.clone()),
                    PathSegment::Relation(_) => None,
                })
                .collect();
            let distinct: BTreeSet<_> = entity_ids.iter().collect();
            assert_eq!(distinct.len(), entity_ids.len(), "path repeats an entity");
        }
    }
}

// =============================================================================
// METADATA MUTATION
// =============================================================================

mod metadata_mutation {
    use super::*;

    #[test]
    fn merge_then_invalid_path_rolls_back() {
        let store = GraphStore::in_memory();
        store
            .create_entities(vec![Entity {
                metadata: Some(as_map(json!({"nested": {"a": 1}}))),
                ..entity("e1", "person", "Ada")
            }])
            .expect("create");

        let updated = store
            .update_entity_metadata("e1", &as_map(json!({"nested.b": "x"})), MetadataOp::Merge)
            .expect("merge");
        assert_eq!(
            Value::Object(updated.metadata.expect("metadata")),
            json!({"nested": {"a": 1, "b": "x"}})
        );

        let result = store.update_entity_metadata(
            "e1",
            &as_map(json!({"nested.a.sub": 1})),
            MetadataOp::Merge,
        );
        assert!(matches!(result, Err(EngramError::BadArgument(_))));

        let document = store.read_document();
        assert_eq!(
            Value::Object(document.entities["e1"].metadata.clone().expect("metadata")),
            json!({"nested": {"a": 1, "b": "x"}})
        );
    }

    #[test]
    fn bulk_update_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");

        let store = GraphStore::open(&path).expect("open");
        store
            .create_entities(vec![
                entity("e1", "person", "Ada"),
                entity("e2", "person", "Grace"),
                entity("e3", "company", "Acme"),
            ])
            .expect("create");
        store
            .bulk_update_metadata(
                &EntityFilter {
                    entity_type: "person".into(),
                    ..EntityFilter::default()
                },
                &as_map(json!({"audited": true})),
                MetadataOp::Merge,
            )
            .expect("bulk update");

        let reopened = GraphStore::open(&path).expect("reopen").read_document();
        assert!(reopened.entities["e1"].metadata.is_some());
        assert!(reopened.entities["e2"].metadata.is_some());
        assert!(reopened.entities["e3"].metadata.is_none());
    }
}
