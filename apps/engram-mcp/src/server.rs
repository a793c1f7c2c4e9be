//! # Engram MCP Server
//!
//! Implements `ServerHandler` with one MCP tool per store verb. The
//! tool layer owns argument validation (operator names, sort order,
//! metadata operation, RFC 3339 timestamps) and maps store errors onto
//! MCP error payloads; all graph logic lives in `engram-core`.

use chrono::{DateTime, Utc};
use engram_core::{
    Entity, EngramError, EntityFilter, Filter, FilterCondition, FilterOperator, GraphStore,
    Metadata, MetadataOp, NodeFilter, Observation, PathParams, QueryInput, QueryTarget, Relation,
    RelationFilter, SortOrder, SubgraphParams, TraversalAlgorithm, TraversalFilters,
    TraverseParams,
};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// MCP SERVER
// =============================================================================

/// MCP server serving an in-process graph store.
#[derive(Clone)]
pub struct EngramMcp {
    store: Arc<GraphStore>,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

// =============================================================================
// RECORD ARGUMENTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EntityArg {
    /// Unique id; generated when omitted.
    #[serde(default)]
    pub id: String,
    /// Entity type, e.g. 'person' or 'company'.
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form metadata object.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl From<EntityArg> for Entity {
    fn from(arg: EntityArg) -> Self {
        Self {
            id: arg.id,
            entity_type: arg.entity_type,
            name: arg.name,
            description: arg.description,
            metadata: arg.metadata,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RelationArg {
    /// Unique id; generated when omitted. For deletion, an empty id
    /// falls back to structural matching on (source, target, type).
    #[serde(default)]
    pub id: String,
    /// Relation type, e.g. 'knows' or 'works_at'.
    #[serde(rename = "type", default)]
    pub relation_type: String,
    /// Source entity id.
    #[serde(default)]
    pub source: String,
    /// Target entity id.
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub bidirectional: bool,
}

impl From<RelationArg> for Relation {
    fn from(arg: RelationArg) -> Self {
        Self {
            id: arg.id,
            relation_type: arg.relation_type,
            source: arg.source,
            target: arg.target,
            description: arg.description,
            metadata: arg.metadata,
            weight: arg.weight,
            bidirectional: arg.bidirectional,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ObservationArg {
    /// Unique id; generated when omitted.
    #[serde(default)]
    pub id: String,
    /// Id of the observed entity.
    pub entity_id: String,
    /// Observation type, e.g. 'log' or 'event'.
    #[serde(rename = "type", default)]
    pub observation_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// RFC 3339 timestamp; the current time is used when omitted.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// =============================================================================
// FILTER ARGUMENTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConditionArg {
    /// Property path, e.g. 'type', 'name' or 'metadata.department'.
    pub property: String,
    /// Value the property must equal.
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NodeFilterArg {
    #[serde(default)]
    pub conditions: Vec<ConditionArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RelationFilterArg {
    #[serde(default)]
    pub conditions: Vec<ConditionArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FiltersArg {
    #[serde(default)]
    pub node_filter: Option<NodeFilterArg>,
    #[serde(default)]
    pub relation_filter: Option<RelationFilterArg>,
}

fn to_conditions(args: Vec<ConditionArg>) -> Vec<FilterCondition> {
    args.into_iter()
        .map(|arg| FilterCondition {
            property: arg.property,
            value: arg.value,
        })
        .collect()
}

fn to_filters(args: Option<FiltersArg>) -> Option<TraversalFilters> {
    args.map(|filters| TraversalFilters {
        node_filter: filters.node_filter.map(|f| NodeFilter {
            conditions: to_conditions(f.conditions),
        }),
        relation_filter: filters.relation_filter.map(|f| RelationFilter {
            conditions: to_conditions(f.conditions),
        }),
    })
}

// =============================================================================
// TOOL PARAMETER STRUCTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateEntitiesParams {
    pub entities: Vec<EntityArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateEntitiesParams {
    /// Patches; each must carry an id, other non-empty fields replace,
    /// metadata is shallow-merged.
    pub entities: Vec<EntityArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteEntitiesParams {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRelationsParams {
    pub relations: Vec<RelationArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteRelationsParams {
    pub relations: Vec<RelationArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddObservationsParams {
    pub observations: Vec<ObservationArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteObservationsParams {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OpenNodesParams {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchNodesParams {
    /// Exact entity type to match; empty matches every type.
    #[serde(rename = "type", default)]
    pub entity_type: String,
    /// Metadata keys that must be present with equal values.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchByTextParams {
    /// Case-insensitive substring to look for.
    pub query: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FilterArg {
    /// Field to filter on, e.g. 'id', 'type' or 'metadata.status'.
    pub field: String,
    /// One of: eq, neq, in, nin, contains, gt, gte, lt, lte.
    pub operator: String,
    /// Comparison value; 'in'/'nin' require an array.
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryParams {
    /// 'entity' or 'relation'.
    pub target_type: String,
    #[serde(default)]
    pub filters: Vec<FilterArg>,
    /// Field to sort by, e.g. 'id' or 'metadata.age'.
    #[serde(default)]
    pub sort_by: String,
    /// 'asc' (default) or 'desc'.
    #[serde(default)]
    pub sort_order: String,
    /// Max results; non-positive means the default of 100.
    #[serde(default)]
    pub limit: i64,
    /// Results to skip; negative means 0.
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TraverseGraphParams {
    pub start_node_ids: Vec<String>,
    /// 'BFS' (default) or 'DFS'.
    #[serde(default)]
    pub algorithm: String,
    /// Maximum traversal depth; -1 (default) means unbounded.
    #[serde(default = "unbounded")]
    pub max_depth: i32,
    #[serde(default)]
    pub filters: Option<FiltersArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetSubgraphParams {
    pub start_node_ids: Vec<String>,
    /// Maximum distance (hops) from the start nodes; must be >= 0.
    #[serde(default)]
    pub radius: i32,
    #[serde(default)]
    pub filters: Option<FiltersArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FindPathsParams {
    pub start_node_id: String,
    pub end_node_id: String,
    /// Maximum path length in relations; -1 (default) means unbounded.
    #[serde(default = "unbounded")]
    pub max_length: i32,
    #[serde(default)]
    pub filters: Option<FiltersArg>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetEntityTimelineParams {
    pub entity_id: String,
    /// Start of the time window (RFC 3339); omitted means unbounded.
    #[serde(default)]
    pub start_time: Option<String>,
    /// End of the time window (RFC 3339); omitted means unbounded.
    #[serde(default)]
    pub end_time: Option<String>,
    /// Observation type to match exactly.
    #[serde(rename = "type", default)]
    pub observation_type: String,
    /// Observations sharing any of these tags match.
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EntityFilterArg {
    /// Exact entity type to match.
    #[serde(rename = "type", default)]
    pub entity_type: String,
    /// Case-sensitive substring of the entity name.
    #[serde(default)]
    pub name_contains: String,
    /// Case-sensitive substring of the entity description.
    #[serde(default)]
    pub description_contains: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateEntityMetadataParams {
    pub entity_id: String,
    /// Updates keyed by dot path, e.g. 'status' or 'nested.a.b'.
    pub updates: Metadata,
    /// 'merge' (default), 'replace' or 'delete'.
    #[serde(default)]
    pub operation: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BulkUpdateMetadataParams {
    /// At least one criterion must be non-empty.
    pub filter: EntityFilterArg,
    /// Updates keyed by dot path, e.g. 'status' or 'nested.a.b'.
    pub updates: Metadata,
    /// 'merge' (default), 'replace' or 'delete'.
    #[serde(default)]
    pub operation: String,
}

fn unbounded() -> i32 {
    -1
}

// =============================================================================
// VALIDATION HELPERS
// =============================================================================

fn store_error(err: EngramError) -> McpError {
    let message = err.to_string();
    match err {
        EngramError::BadArgument(_) => McpError::invalid_params(message, None),
        _ => McpError::internal_error(message, None),
    }
}

fn json_content<T: serde::Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(format!("failed to serialize result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn parse_timestamp(value: Option<&String>, field: &str) -> Result<Option<DateTime<Utc>>, McpError> {
    match value {
        Some(text) if !text.is_empty() => text.parse::<DateTime<Utc>>().map(Some).map_err(|e| {
            McpError::invalid_params(format!("invalid '{field}' (expected RFC 3339): {e}"), None)
        }),
        _ => Ok(None),
    }
}

fn parse_operation(name: &str) -> Result<MetadataOp, McpError> {
    match name.to_lowercase().as_str() {
        "" | "merge" => Ok(MetadataOp::Merge),
        "replace" => Ok(MetadataOp::Replace),
        "delete" => Ok(MetadataOp::Delete),
        other => Err(McpError::invalid_params(
            format!("invalid operation '{other}': must be 'merge', 'replace' or 'delete'"),
            None,
        )),
    }
}

fn parse_algorithm(name: &str) -> Result<TraversalAlgorithm, McpError> {
    match name {
        "" | "BFS" => Ok(TraversalAlgorithm::Bfs),
        "DFS" => Ok(TraversalAlgorithm::Dfs),
        other => Err(McpError::invalid_params(
            format!("unknown traversal algorithm '{other}': must be 'BFS' or 'DFS'"),
            None,
        )),
    }
}

fn parse_operator(name: &str) -> Result<FilterOperator, McpError> {
    match name {
        "eq" => Ok(FilterOperator::Eq),
        "neq" => Ok(FilterOperator::Neq),
        "in" => Ok(FilterOperator::In),
        "nin" => Ok(FilterOperator::Nin),
        "contains" => Ok(FilterOperator::Contains),
        "gt" => Ok(FilterOperator::Gt),
        "gte" => Ok(FilterOperator::Gte),
        "lt" => Ok(FilterOperator::Lt),
        "lte" => Ok(FilterOperator::Lte),
        other => Err(McpError::invalid_params(
            format!("invalid filter operator '{other}'"),
            None,
        )),
    }
}

fn build_query_input(params: QueryParams) -> Result<QueryInput, McpError> {
    let target_type = match params.target_type.as_str() {
        "entity" => QueryTarget::Entity,
        "relation" => QueryTarget::Relation,
        other => {
            return Err(McpError::invalid_params(
                format!("invalid 'target_type' '{other}': must be 'entity' or 'relation'"),
                None,
            ));
        }
    };

    let sort_order = match params.sort_order.as_str() {
        "" | "asc" => SortOrder::Asc,
        "desc" => SortOrder::Desc,
        other => {
            return Err(McpError::invalid_params(
                format!("invalid 'sort_order' '{other}': must be 'asc' or 'desc'"),
                None,
            ));
        }
    };

    let mut filters = Vec::with_capacity(params.filters.len());
    for (i, filter) in params.filters.into_iter().enumerate() {
        if filter.field.is_empty() {
            return Err(McpError::invalid_params(
                format!("filter at index {i} is missing 'field'"),
                None,
            ));
        }
        let operator = parse_operator(&filter.operator)
            .map_err(|e| McpError::invalid_params(format!("filter at index {i}: {e}"), None))?;

        let value = match filter.value {
            None | Some(Value::Null) => {
                // Null is comparable only by presence.
                if !matches!(operator, FilterOperator::Eq | FilterOperator::Neq) {
                    return Err(McpError::invalid_params(
                        format!(
                            "filter at index {i} is missing 'value' (required for operator \
                             '{}')",
                            filter.operator
                        ),
                        None,
                    ));
                }
                Value::Null
            }
            Some(value) => {
                if matches!(operator, FilterOperator::In | FilterOperator::Nin)
                    && !value.is_array()
                {
                    return Err(McpError::invalid_params(
                        format!(
                            "filter at index {i}: 'value' must be an array for operator '{}'",
                            filter.operator
                        ),
                        None,
                    ));
                }
                value
            }
        };

        filters.push(Filter {
            field: filter.field,
            operator,
            value,
        });
    }

    Ok(QueryInput {
        filters,
        sort_by: params.sort_by,
        sort_order,
        limit: params.limit,
        offset: params.offset,
        target_type,
    })
}

fn build_observations(args: Vec<ObservationArg>) -> Result<Vec<Observation>, McpError> {
    let mut observations = Vec::with_capacity(args.len());
    for arg in args {
        let timestamp = parse_timestamp(arg.timestamp.as_ref(), "timestamp")?;
        observations.push(Observation {
            id: arg.id,
            entity_id: arg.entity_id,
            observation_type: arg.observation_type,
            content: arg.content,
            description: arg.description,
            metadata: arg.metadata,
            timestamp,
            tags: arg.tags,
        });
    }
    Ok(observations)
}

// =============================================================================
// TOOL IMPLEMENTATIONS
// =============================================================================

#[tool_router]
impl EngramMcp {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Create entities in the knowledge graph; ids are generated when omitted")]
    async fn create_entities(
        &self,
        params: Parameters<CreateEntitiesParams>,
    ) -> Result<CallToolResult, McpError> {
        let entities = params.0.entities.into_iter().map(Entity::from).collect();
        let created = self.store.create_entities(entities).map_err(store_error)?;
        json_content(&created)
    }

    #[tool(
        description = "Apply partial updates to existing entities; non-empty fields replace, metadata is shallow-merged"
    )]
    async fn update_entities(
        &self,
        params: Parameters<UpdateEntitiesParams>,
    ) -> Result<CallToolResult, McpError> {
        let patches = params.0.entities.into_iter().map(Entity::from).collect();
        let updated = self.store.update_entities(patches).map_err(store_error)?;
        json_content(&updated)
    }

    #[tool(description = "Delete entities by id; every listed id must exist")]
    async fn delete_entities(
        &self,
        params: Parameters<DeleteEntitiesParams>,
    ) -> Result<CallToolResult, McpError> {
        self.store
            .delete_entities(&params.0.ids)
            .map_err(store_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Deleted {} entities.",
            params.0.ids.len()
        ))]))
    }

    #[tool(
        description = "Create directed relations between existing entities; ids are generated when omitted"
    )]
    async fn create_relations(
        &self,
        params: Parameters<CreateRelationsParams>,
    ) -> Result<CallToolResult, McpError> {
        let relations = params.0.relations.into_iter().map(Relation::from).collect();
        let created = self.store.create_relations(relations).map_err(store_error)?;
        json_content(&created)
    }

    #[tool(
        description = "Delete relations by id, or by (source, target, type) when no id is given; non-matches are tolerated"
    )]
    async fn delete_relations(
        &self,
        params: Parameters<DeleteRelationsParams>,
    ) -> Result<CallToolResult, McpError> {
        let specs: Vec<Relation> = params.0.relations.into_iter().map(Relation::from).collect();
        self.store.delete_relations(&specs).map_err(store_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            "Matching relations deleted.".to_string(),
        )]))
    }

    #[tool(
        description = "Add time-stamped observations to entities; the current time is used when no timestamp is given"
    )]
    async fn add_observations(
        &self,
        params: Parameters<AddObservationsParams>,
    ) -> Result<CallToolResult, McpError> {
        let observations = build_observations(params.0.observations)?;
        let created = self
            .store
            .add_observations(observations)
            .map_err(store_error)?;
        json_content(&created)
    }

    #[tool(description = "Delete observations by id; every listed id must exist")]
    async fn delete_observations(
        &self,
        params: Parameters<DeleteObservationsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.store
            .delete_observations(&params.0.ids)
            .map_err(store_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Deleted {} observations.",
            params.0.ids.len()
        ))]))
    }

    #[tool(description = "Read the entire knowledge graph: entities, relations and observations")]
    async fn read_graph(&self) -> Result<CallToolResult, McpError> {
        json_content(&self.store.read_document())
    }

    #[tool(
        description = "Open specific entities by id, returning them plus every relation touching them"
    )]
    async fn open_nodes(
        &self,
        params: Parameters<OpenNodesParams>,
    ) -> Result<CallToolResult, McpError> {
        let projection = self.store.open_nodes(&params.0.ids).map_err(store_error)?;
        json_content(&projection)
    }

    #[tool(description = "Find entities by exact type and metadata equality")]
    async fn search_nodes(
        &self,
        params: Parameters<SearchNodesParams>,
    ) -> Result<CallToolResult, McpError> {
        let metadata = params.0.metadata.unwrap_or_default();
        let results = self.store.search_nodes(&params.0.entity_type, &metadata);
        json_content(&results)
    }

    #[tool(
        description = "Case-insensitive text search across entity names, types, descriptions, metadata, observations and relations"
    )]
    async fn search_by_text(
        &self,
        params: Parameters<SearchByTextParams>,
    ) -> Result<CallToolResult, McpError> {
        let results = self.store.search_by_text(&params.0.query);
        json_content(&results)
    }

    #[tool(
        description = "Structured query over entities or relations with filtering, sorting and pagination"
    )]
    async fn query(&self, params: Parameters<QueryParams>) -> Result<CallToolResult, McpError> {
        let input = build_query_input(params.0)?;
        let output = self.store.query(&input).map_err(store_error)?;
        json_content(&output)
    }

    #[tool(
        description = "Graph traversal (BFS or DFS) from start nodes, returning visited entities and their depths"
    )]
    async fn traverse_graph(
        &self,
        params: Parameters<TraverseGraphParams>,
    ) -> Result<CallToolResult, McpError> {
        let algorithm = parse_algorithm(&params.0.algorithm)?;
        let traverse_params = TraverseParams {
            start_ids: params.0.start_node_ids,
            algorithm,
            max_depth: params.0.max_depth,
            filters: to_filters(params.0.filters),
        };
        let result = self.store.traverse(&traverse_params).map_err(store_error)?;
        json_content(&result)
    }

    #[tool(
        description = "Extract the subgraph within a radius (hops) of the start nodes, including connecting relations"
    )]
    async fn get_subgraph(
        &self,
        params: Parameters<GetSubgraphParams>,
    ) -> Result<CallToolResult, McpError> {
        let subgraph_params = SubgraphParams {
            start_ids: params.0.start_node_ids,
            radius: params.0.radius,
            filters: to_filters(params.0.filters),
        };
        let projection = self
            .store
            .get_subgraph(&subgraph_params)
            .map_err(store_error)?;
        json_content(&projection)
    }

    #[tool(
        description = "Find all simple paths (no repeated entities) between two entities, following relation direction"
    )]
    async fn find_paths(
        &self,
        params: Parameters<FindPathsParams>,
    ) -> Result<CallToolResult, McpError> {
        let path_params = PathParams {
            start_id: params.0.start_node_id,
            end_id: params.0.end_node_id,
            max_length: params.0.max_length,
            filters: to_filters(params.0.filters),
        };
        let paths = self.store.find_paths(&path_params).map_err(store_error)?;
        json_content(&paths)
    }

    #[tool(
        description = "Chronological timeline of an entity's observations, filtered by time window, type and tags"
    )]
    async fn get_entity_timeline(
        &self,
        params: Parameters<GetEntityTimelineParams>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0;
        if args.entity_id.is_empty() {
            return Err(McpError::invalid_params(
                "missing required field 'entity_id'".to_string(),
                None,
            ));
        }
        let start = parse_timestamp(args.start_time.as_ref(), "start_time")?;
        let end = parse_timestamp(args.end_time.as_ref(), "end_time")?;
        let timeline = self
            .store
            .entity_timeline(&args.entity_id, start, end, &args.observation_type, &args.tags)
            .map_err(store_error)?;
        json_content(&timeline)
    }

    #[tool(
        description = "Update one entity's metadata by dot path; supports 'merge' (default), 'replace' and 'delete'"
    )]
    async fn update_entity_metadata(
        &self,
        params: Parameters<UpdateEntityMetadataParams>,
    ) -> Result<CallToolResult, McpError> {
        let operation = parse_operation(&params.0.operation)?;
        let updated = self
            .store
            .update_entity_metadata(&params.0.entity_id, &params.0.updates, operation)
            .map_err(store_error)?;
        json_content(&updated)
    }

    #[tool(
        description = "Update metadata for every entity matching a filter (type, name_contains, description_contains)"
    )]
    async fn bulk_update_metadata(
        &self,
        params: Parameters<BulkUpdateMetadataParams>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0;
        let filter = EntityFilter {
            entity_type: args.filter.entity_type,
            name_contains: args.filter.name_contains,
            description_contains: args.filter.description_contains,
        };
        if filter.is_empty() {
            return Err(McpError::invalid_params(
                "bulk update filter must contain at least one criterion \
                 (type, name_contains, description_contains)"
                    .to_string(),
                None,
            ));
        }
        let operation = parse_operation(&args.operation)?;
        let updated = self
            .store
            .bulk_update_metadata(&filter, &args.updates, operation)
            .map_err(store_error)?;
        json_content(&updated)
    }
}

// =============================================================================
// SERVER HANDLER
// =============================================================================

#[tool_handler]
impl ServerHandler for EngramMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Engram knowledge-graph memory server. Use tools to create entities, \
                 relations and observations, run structured queries, traverse the graph, \
                 extract subgraphs, enumerate paths, read entity timelines, and mutate \
                 metadata by dot path."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
