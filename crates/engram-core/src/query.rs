//! # Query Engine
//!
//! Structured queries over a record family: an ordered list of filter
//! predicates (AND), an optional stable type-aware sort, and
//! offset/limit pagination.
//!
//! Operators are parsed at deserialization time, so an unknown operator
//! never reaches evaluation; arity mistakes (`in` without a sequence,
//! `contains` on non-strings) still surface as `BadArgument` during
//! evaluation and abort the whole query.

use crate::types::{Entity, EngramError, Relation};
use crate::{compare, extract};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Page size applied when the caller passes no limit (or a non-positive
/// one).
pub const DEFAULT_LIMIT: i64 = 100;

// =============================================================================
// QUERY TYPES
// =============================================================================

/// The record family a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryTarget {
    Entity,
    Relation,
}

/// Filter operator. Unknown names fail deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    In,
    Nin,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A single filtering condition on a dotted field path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// An incoming query request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInput {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub target_type: QueryTarget,
}

/// The matching records of one family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResults {
    Entities(Vec<Entity>),
    Relations(Vec<Relation>),
}

impl QueryResults {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Entities(items) => items.len(),
            Self::Relations(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Query results plus the pagination actually applied.
///
/// `total` counts all matches before pagination; `limit` and `offset`
/// reflect the defaults used when the input left them unset.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub results: QueryResults,
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
}

// =============================================================================
// FILTER EVALUATION
// =============================================================================

fn require_sequence<'a>(filter: &'a Filter) -> Result<&'a Vec<Value>, EngramError> {
    filter.value.as_array().ok_or_else(|| {
        EngramError::BadArgument(format!(
            "value for '{:?}' operator on field '{}' must be a sequence",
            filter.operator, filter.field
        ))
    })
}

/// Decide whether an extracted value satisfies one filter.
///
/// `None` is the extractor's "field absent" signal: a missing
/// `metadata.*` key never matches, whatever the operator.
fn matches_filter(value: Option<Value>, filter: &Filter) -> Result<bool, EngramError> {
    let Some(value) = value else {
        return Ok(false);
    };

    // An extracted null compares by presence, not by magnitude.
    if value.is_null() {
        return match filter.operator {
            FilterOperator::Eq => Ok(filter.value.is_null()),
            FilterOperator::Neq => Ok(!filter.value.is_null()),
            FilterOperator::In => Ok(require_sequence(filter)?.iter().any(Value::is_null)),
            FilterOperator::Nin => Ok(!require_sequence(filter)?.iter().any(Value::is_null)),
            _ => Ok(false),
        };
    }

    if filter.value.is_null() {
        return match filter.operator {
            FilterOperator::Eq => Ok(false),
            FilterOperator::Neq => Ok(true),
            _ => Err(EngramError::BadArgument(format!(
                "operator '{:?}' cannot compare field '{}' against null",
                filter.operator, filter.field
            ))),
        };
    }

    match filter.operator {
        FilterOperator::Eq => Ok(compare::values_equal(&value, &filter.value)),
        FilterOperator::Neq => Ok(!compare::values_equal(&value, &filter.value)),
        FilterOperator::Gt => Ok(compare::compare_order(&value, &filter.value)? == Ordering::Greater),
        FilterOperator::Gte => Ok(compare::compare_order(&value, &filter.value)? != Ordering::Less),
        FilterOperator::Lt => Ok(compare::compare_order(&value, &filter.value)? == Ordering::Less),
        FilterOperator::Lte => {
            Ok(compare::compare_order(&value, &filter.value)? != Ordering::Greater)
        }
        FilterOperator::In => Ok(require_sequence(filter)?
            .iter()
            .any(|candidate| compare::values_equal(&value, candidate))),
        FilterOperator::Nin => Ok(!require_sequence(filter)?
            .iter()
            .any(|candidate| compare::values_equal(&value, candidate))),
        FilterOperator::Contains => match (&value, &filter.value) {
            (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle)),
            _ => Err(EngramError::BadArgument(format!(
                "'contains' on field '{}' requires string field and filter values",
                filter.field
            ))),
        },
    }
}

// =============================================================================
// FILTER / SORT / PAGINATE PIPELINE
// =============================================================================

/// Run the full pipeline over one family's records.
///
/// Returns the page slice and the pre-pagination match count.
fn run_query<T, F>(
    items: Vec<T>,
    input: &QueryInput,
    extract: F,
) -> Result<(Vec<T>, usize), EngramError>
where
    F: Fn(&T, &str) -> Result<Option<Value>, EngramError>,
{
    let mut filtered = Vec::with_capacity(items.len());
    for item in items {
        let mut keep = true;
        for filter in &input.filters {
            let value = extract(&item, &filter.field)?;
            if !matches_filter(value, filter)? {
                keep = false;
                break;
            }
        }
        if keep {
            filtered.push(item);
        }
    }
    let total = filtered.len();

    if !input.sort_by.is_empty() {
        let descending = input.sort_order == SortOrder::Desc;
        // Extraction failures sort as "missing": before everything
        // ascending, after everything descending.
        filtered.sort_by(|a, b| {
            let left = extract(a, &input.sort_by).ok().flatten();
            let right = extract(b, &input.sort_by).ok().flatten();
            let ordering = compare::sort_ordering(left.as_ref(), right.as_ref());
            if descending { ordering.reverse() } else { ordering }
        });
    }

    let limit = usize::try_from(if input.limit <= 0 { DEFAULT_LIMIT } else { input.limit })
        .unwrap_or(usize::MAX);
    let offset = usize::try_from(input.offset.max(0)).unwrap_or(0);
    let page = filtered.into_iter().skip(offset).take(limit).collect();

    Ok((page, total))
}

impl crate::GraphStore {
    /// Perform a structured query with filtering, sorting and pagination.
    pub fn query(&self, input: &QueryInput) -> Result<QueryOutput, EngramError> {
        let graph = self.graph().read();

        let (results, total) = match input.target_type {
            QueryTarget::Entity => {
                let items: Vec<Entity> = graph.entities.values().cloned().collect();
                let (page, total) = run_query(items, input, |e, field| {
                    extract::entity_field(e, field)
                })?;
                (QueryResults::Entities(page), total)
            }
            QueryTarget::Relation => {
                let items: Vec<Relation> = graph.relations.values().cloned().collect();
                let (page, total) = run_query(items, input, |r, field| {
                    extract::relation_field(r, field)
                })?;
                (QueryResults::Relations(page), total)
            }
        };
        drop(graph);

        Ok(QueryOutput {
            results,
            total,
            limit: if input.limit <= 0 { DEFAULT_LIMIT } else { input.limit },
            offset: input.offset.max(0),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
