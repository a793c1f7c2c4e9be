//! # Graph Traversal
//!
//! BFS and DFS over the knowledge graph, radius-bounded subgraph
//! extraction, and simple-path enumeration, all parameterized by
//! node- and relation-predicates.
//!
//! The algorithms see the graph through the [`GraphAccessor`] trait and
//! receive their policies as capability objects: a **visit predicate**
//! decides whether an entity is recorded and explored at a given depth,
//! and a **neighbor function** decides which entities are reachable in
//! one step. The default neighbor function treats the graph as
//! undirected (union of outgoing and incoming relations, deduplicated);
//! path enumeration follows outgoing relations only.

use crate::types::{Entity, EngramError, GraphDocument, GraphProjection, Relation};
use crate::{compare, extract};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// GRAPH ACCESSOR
// =============================================================================

/// Read access the traversal algorithms need, decoupled from the store.
pub trait GraphAccessor {
    /// Look up an entity by id.
    fn entity(&self, id: &str) -> Option<Entity>;
    /// Relations whose source is `id`.
    fn relations_from(&self, id: &str) -> Vec<Relation>;
    /// Relations whose target is `id`.
    fn relations_to(&self, id: &str) -> Vec<Relation>;
}

/// Accessor over a borrowed document. The caller holds the store's read
/// lock for as long as this is alive; results are copied out.
pub struct DocumentAccessor<'a> {
    document: &'a GraphDocument,
}

impl<'a> DocumentAccessor<'a> {
    #[must_use]
    pub fn new(document: &'a GraphDocument) -> Self {
        Self { document }
    }
}

impl GraphAccessor for DocumentAccessor<'_> {
    fn entity(&self, id: &str) -> Option<Entity> {
        self.document.entities.get(id).cloned()
    }

    fn relations_from(&self, id: &str) -> Vec<Relation> {
        self.document
            .relations
            .values()
            .filter(|relation| relation.source == id)
            .cloned()
            .collect()
    }

    fn relations_to(&self, id: &str) -> Vec<Relation> {
        self.document
            .relations
            .values()
            .filter(|relation| relation.target == id)
            .cloned()
            .collect()
    }
}

// =============================================================================
// PREDICATES
// =============================================================================

/// One equality condition on a dotted property path, resolved through the
/// field extractor and compared type-aware.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterCondition {
    pub property: String,
    #[serde(default)]
    pub value: Value,
}

/// Entity predicate: all conditions must hold (AND).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeFilter {
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

/// Relation predicate: all conditions must hold (AND).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationFilter {
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

/// Filters for traversal, subgraph extraction and path finding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_filter: Option<NodeFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_filter: Option<RelationFilter>,
}

fn matches_entity(entity: &Entity, filter: &NodeFilter) -> bool {
    filter.conditions.iter().all(|condition| {
        match extract::entity_field(entity, &condition.property) {
            Ok(Some(value)) => compare::values_equal(&value, &condition.value),
            // A missing or unknown property is a non-match, not an error.
            _ => false,
        }
    })
}

fn matches_relation(relation: &Relation, filter: &RelationFilter) -> bool {
    filter.conditions.iter().all(|condition| {
        match extract::relation_field(relation, &condition.property) {
            Ok(Some(value)) => compare::values_equal(&value, &condition.value),
            _ => false,
        }
    })
}

// =============================================================================
// NEIGHBOR FUNCTIONS
// =============================================================================

/// Undirected neighbors: entities reachable through outgoing or incoming
/// relations, deduplicated, in deterministic id order.
#[must_use]
pub fn default_neighbors(graph: &dyn GraphAccessor, current: &Entity) -> Vec<Entity> {
    let mut neighbors: BTreeMap<String, Entity> = BTreeMap::new();
    for relation in graph.relations_from(&current.id) {
        if let Some(target) = graph.entity(&relation.target) {
            neighbors.insert(target.id.clone(), target);
        }
    }
    for relation in graph.relations_to(&current.id) {
        if let Some(source) = graph.entity(&relation.source) {
            neighbors.insert(source.id.clone(), source);
        }
    }
    neighbors.into_values().collect()
}

/// Undirected neighbors reachable only through relations that satisfy
/// `filter`.
#[must_use]
pub fn filtered_neighbors(
    graph: &dyn GraphAccessor,
    current: &Entity,
    filter: &RelationFilter,
) -> Vec<Entity> {
    let mut neighbors: BTreeMap<String, Entity> = BTreeMap::new();
    for relation in graph.relations_from(&current.id) {
        if matches_relation(&relation, filter) {
            if let Some(target) = graph.entity(&relation.target) {
                neighbors.insert(target.id.clone(), target);
            }
        }
    }
    for relation in graph.relations_to(&current.id) {
        if matches_relation(&relation, filter) {
            if let Some(source) = graph.entity(&relation.source) {
                neighbors.insert(source.id.clone(), source);
            }
        }
    }
    neighbors.into_values().collect()
}

// =============================================================================
// BFS / DFS
// =============================================================================

/// Breadth-first search.
///
/// `visit` is called for every candidate node with its discovery depth;
/// returning false skips the node entirely (it is neither recorded nor
/// explored). `max_depth` of −1 means unbounded. A start id that does
/// not exist is an error.
pub fn bfs(
    graph: &dyn GraphAccessor,
    start_ids: &[String],
    max_depth: i32,
    visit: &mut dyn FnMut(&Entity, usize) -> bool,
    neighbors: &dyn Fn(&dyn GraphAccessor, &Entity) -> Vec<Entity>,
) -> Result<(), EngramError> {
    let mut queue: VecDeque<(Entity, usize)> = VecDeque::new();
    let mut visited: BTreeMap<String, usize> = BTreeMap::new();

    for start_id in start_ids {
        if visited.contains_key(start_id) {
            continue;
        }
        let start = graph.entity(start_id).ok_or_else(|| {
            EngramError::NotFound(format!("start node with id '{start_id}' not found"))
        })?;
        if !visit(&start, 0) {
            continue;
        }
        visited.insert(start_id.clone(), 0);
        queue.push_back((start, 0));
    }

    while let Some((current, depth)) = queue.pop_front() {
        let next_depth = depth + 1;
        if max_depth >= 0 && next_depth > max_depth as usize {
            continue;
        }

        for neighbor in neighbors(graph, &current) {
            if visited.contains_key(&neighbor.id) {
                continue;
            }
            if !visit(&neighbor, next_depth) {
                continue;
            }
            visited.insert(neighbor.id.clone(), next_depth);
            queue.push_back((neighbor, next_depth));
        }
    }

    Ok(())
}

/// Depth-first search.
///
/// Same contract as [`bfs`] with a stack; start ids are pushed in
/// reverse so iteration order matches their input order. A node may be
/// revisited when reached at a strictly shallower depth than previously
/// recorded.
pub fn dfs(
    graph: &dyn GraphAccessor,
    start_ids: &[String],
    max_depth: i32,
    visit: &mut dyn FnMut(&Entity, usize) -> bool,
    neighbors: &dyn Fn(&dyn GraphAccessor, &Entity) -> Vec<Entity>,
) -> Result<(), EngramError> {
    let mut stack: Vec<(Entity, usize)> = Vec::new();
    let mut visited: BTreeMap<String, usize> = BTreeMap::new();

    for start_id in start_ids.iter().rev() {
        let start = graph.entity(start_id).ok_or_else(|| {
            EngramError::NotFound(format!("start node with id '{start_id}' not found"))
        })?;
        if !visit(&start, 0) {
            continue;
        }
        stack.push((start, 0));
    }

    while let Some((current, depth)) = stack.pop() {
        if visited.get(&current.id).is_some_and(|&seen| seen <= depth) {
            continue;
        }
        visited.insert(current.id.clone(), depth);

        let next_depth = depth + 1;
        if max_depth >= 0 && next_depth > max_depth as usize {
            continue;
        }

        for neighbor in neighbors(graph, &current).into_iter().rev() {
            if visited
                .get(&neighbor.id)
                .is_some_and(|&seen| seen <= next_depth)
            {
                continue;
            }
            if !visit(&neighbor, next_depth) {
                continue;
            }
            stack.push((neighbor, next_depth));
        }
    }

    Ok(())
}

// =============================================================================
// TRAVERSE
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraversalAlgorithm {
    #[default]
    Bfs,
    Dfs,
}

/// Parameters for [`crate::GraphStore::traverse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraverseParams {
    pub start_ids: Vec<String>,
    #[serde(default)]
    pub algorithm: TraversalAlgorithm,
    /// Maximum depth; −1 means unbounded.
    #[serde(default)]
    pub max_depth: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<TraversalFilters>,
}

/// Visited entities and the depth each was discovered at.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraverseResult {
    pub visited_entities: Vec<Entity>,
    pub visited_depths: BTreeMap<String, usize>,
}

/// Parameters for [`crate::GraphStore::get_subgraph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubgraphParams {
    pub start_ids: Vec<String>,
    /// Maximum distance from the start nodes; must be ≥ 0.
    #[serde(default)]
    pub radius: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<TraversalFilters>,
}

/// Parameters for [`crate::GraphStore::find_paths`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathParams {
    pub start_id: String,
    pub end_id: String,
    /// Maximum number of relations in a path; −1 means unbounded.
    #[serde(default)]
    pub max_length: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<TraversalFilters>,
}

/// One element of a path: entities and relations alternate, starting and
/// ending with an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Entity(Entity),
    Relation(Relation),
}

/// An alternating entity/relation sequence with no repeated entity.
pub type Path = Vec<PathSegment>;

impl crate::GraphStore {
    /// Execute a BFS or DFS traversal.
    pub fn traverse(&self, params: &TraverseParams) -> Result<TraverseResult, EngramError> {
        let graph = self.graph().read();
        let accessor = DocumentAccessor::new(&graph);
        let node_filter = params.filters.as_ref().and_then(|f| f.node_filter.as_ref());
        let relation_filter = params
            .filters
            .as_ref()
            .and_then(|f| f.relation_filter.as_ref());

        let mut visited_entities: Vec<Entity> = Vec::new();
        let mut visited_depths: BTreeMap<String, usize> = BTreeMap::new();

        let mut visit = |entity: &Entity, depth: usize| -> bool {
            if let Some(filter) = node_filter {
                if !matches_entity(entity, filter) {
                    return false;
                }
            }
            if !visited_depths.contains_key(&entity.id) {
                visited_entities.push(entity.clone());
            }
            visited_depths.insert(entity.id.clone(), depth);
            true
        };
        let neighbors = |graph: &dyn GraphAccessor, current: &Entity| -> Vec<Entity> {
            match relation_filter {
                Some(filter) => filtered_neighbors(graph, current, filter),
                None => default_neighbors(graph, current),
            }
        };

        match params.algorithm {
            TraversalAlgorithm::Bfs => bfs(
                &accessor,
                &params.start_ids,
                params.max_depth,
                &mut visit,
                &neighbors,
            )?,
            TraversalAlgorithm::Dfs => dfs(
                &accessor,
                &params.start_ids,
                params.max_depth,
                &mut visit,
                &neighbors,
            )?,
        }

        Ok(TraverseResult {
            visited_entities,
            visited_depths,
        })
    }

    /// Extract the subgraph within `radius` hops of the start nodes.
    ///
    /// Phase 1 runs a radius-bounded BFS; the search does not descend
    /// past a filtered-out node. Phase 2 keeps every relation whose
    /// endpoints both lie in the collected set and that satisfies the
    /// optional relation filter.
    pub fn get_subgraph(&self, params: &SubgraphParams) -> Result<GraphProjection, EngramError> {
        if params.radius < 0 {
            return Err(EngramError::BadArgument("radius cannot be negative".into()));
        }

        let graph = self.graph().read();
        let accessor = DocumentAccessor::new(&graph);
        let node_filter = params.filters.as_ref().and_then(|f| f.node_filter.as_ref());
        let relation_filter = params
            .filters
            .as_ref()
            .and_then(|f| f.relation_filter.as_ref());
        let radius = params.radius as usize;

        let mut entities: BTreeMap<String, Entity> = BTreeMap::new();
        let mut visit = |entity: &Entity, depth: usize| -> bool {
            let include = node_filter.is_none_or(|filter| matches_entity(entity, filter));
            if include && depth <= radius {
                entities.insert(entity.id.clone(), entity.clone());
                return true;
            }
            false
        };
        bfs(
            &accessor,
            &params.start_ids,
            params.radius,
            &mut visit,
            &|graph, current| default_neighbors(graph, current),
        )?;

        let mut relations: BTreeMap<String, Relation> = BTreeMap::new();
        for (id, relation) in &graph.relations {
            if !entities.contains_key(&relation.source) || !entities.contains_key(&relation.target)
            {
                continue;
            }
            if let Some(filter) = relation_filter {
                if !matches_relation(relation, filter) {
                    continue;
                }
            }
            relations.insert(id.clone(), relation.clone());
        }

        Ok(GraphProjection {
            entities,
            relations,
        })
    }

    /// Enumerate every distinct simple path from start to end.
    ///
    /// Traversal follows outgoing relations only. A non-existent end id
    /// yields an empty list; a non-existent start id is an error.
    pub fn find_paths(&self, params: &PathParams) -> Result<Vec<Path>, EngramError> {
        let graph = self.graph().read();
        let accessor = DocumentAccessor::new(&graph);
        let node_filter = params.filters.as_ref().and_then(|f| f.node_filter.as_ref());
        let relation_filter = params
            .filters
            .as_ref()
            .and_then(|f| f.relation_filter.as_ref());

        let start = accessor.entity(&params.start_id).ok_or_else(|| {
            EngramError::NotFound(format!(
                "start node with id '{}' not found",
                params.start_id
            ))
        })?;
        if let Some(filter) = node_filter {
            if !matches_entity(&start, filter) {
                return Ok(Vec::new());
            }
        }

        let mut found: Vec<Path> = Vec::new();
        let mut queue: VecDeque<(Path, BTreeSet<String>, Entity)> = VecDeque::new();
        let mut initial_visited = BTreeSet::new();
        initial_visited.insert(start.id.clone());
        queue.push_back((
            vec![PathSegment::Entity(start.clone())],
            initial_visited,
            start,
        ));

        while let Some((path, visited, last)) = queue.pop_front() {
            if last.id == params.end_id {
                found.push(path);
                continue;
            }

            // Path length = number of relations taken so far.
            let current_length = path.len() / 2;
            if params.max_length >= 0 && current_length >= params.max_length as usize {
                continue;
            }

            for relation in accessor.relations_from(&last.id) {
                let Some(neighbor) = accessor.entity(&relation.target) else {
                    continue;
                };
                if visited.contains(&neighbor.id) {
                    continue;
                }
                if let Some(filter) = relation_filter {
                    if !matches_relation(&relation, filter) {
                        continue;
                    }
                }
                if let Some(filter) = node_filter {
                    if !matches_entity(&neighbor, filter) {
                        continue;
                    }
                }

                let mut next_path = path.clone();
                next_path.push(PathSegment::Relation(relation));
                next_path.push(PathSegment::Entity(neighbor.clone()));
                let mut next_visited = visited.clone();
                next_visited.insert(neighbor.id.clone());
                queue.push_back((next_path, next_visited, neighbor));
            }
        }

        Ok(found)
    }
}

// =============================================================================
// TESTS
// =============================================================================
