//! # Graph Benchmarks
//!
//! Performance benchmarks for engram-core store operations.
//!
//! Run with: `cargo bench -p engram-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use engram_core::{Entity, GraphStore, PathParams, Relation, TraversalAlgorithm, TraverseParams};
use std::hint::black_box;

fn entity(id: usize) -> Entity {
    Entity {
        id: format!("e{id}"),
        entity_type: "node".into(),
        name: format!("node {id}"),
        ..Entity::default()
    }
}

fn relation(source: usize, target: usize) -> Relation {
    Relation {
        id: format!("r{source}-{target}"),
        relation_type: "next".into(),
        source: format!("e{source}"),
        target: format!("e{target}"),
        ..Relation::default()
    }
}

/// A chain e0 -> e1 -> ... -> eN.
fn linear_store(size: usize) -> GraphStore {
    let store = GraphStore::in_memory();
    store
        .create_entities((0..size).map(entity).collect())
        .expect("create");
    store
        .create_relations((0..size - 1).map(|i| relation(i, i + 1)).collect())
        .expect("relate");
    store
}

/// A hub e0 with spokes e1..eN.
fn star_store(size: usize) -> GraphStore {
    let store = GraphStore::in_memory();
    store
        .create_entities((0..size).map(entity).collect())
        .expect("create");
    store
        .create_relations((1..size).map(|i| relation(0, i)).collect())
        .expect("relate");
    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_entity_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity_creation");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let store = GraphStore::in_memory();
                store
                    .create_entities((0..size).map(entity).collect())
                    .expect("create");
                black_box(store)
            });
        });
    }

    group.finish();
}

fn bench_bfs_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("bfs_traversal");

    for size in [100, 1000].iter() {
        let store = linear_store(*size);
        group.bench_with_input(BenchmarkId::new("linear", size), size, |b, _| {
            b.iter(|| {
                let result = store
                    .traverse(&TraverseParams {
                        start_ids: vec!["e0".into()],
                        algorithm: TraversalAlgorithm::Bfs,
                        max_depth: -1,
                        filters: None,
                    })
                    .expect("traverse");
                black_box(result)
            });
        });
    }

    for size in [100, 1000].iter() {
        let store = star_store(*size);
        group.bench_with_input(BenchmarkId::new("star", size), size, |b, _| {
            b.iter(|| {
                let result = store
                    .traverse(&TraverseParams {
                        start_ids: vec!["e0".into()],
                        algorithm: TraversalAlgorithm::Bfs,
                        max_depth: -1,
                        filters: None,
                    })
                    .expect("traverse");
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_path_finding(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_finding");

    for size in [50, 200].iter() {
        let store = linear_store(*size);
        let end = format!("e{}", size - 1);
        group.bench_with_input(BenchmarkId::new("linear", size), size, |b, _| {
            b.iter(|| {
                let paths = store
                    .find_paths(&PathParams {
                        start_id: "e0".into(),
                        end_id: end.clone(),
                        max_length: -1,
                        filters: None,
                    })
                    .expect("paths");
                black_box(paths)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_entity_creation,
    bench_bfs_traversal,
    bench_path_finding
);
criterion_main!(benches);
