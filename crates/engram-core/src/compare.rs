//! # Value Comparison
//!
//! Type-aware comparison over free-form metadata values.
//!
//! Rules:
//! - If both sides are numeric (any integer or floating width), compare
//!   as `f64`.
//! - Else if both are strings, compare directly (lexicographically for
//!   ordering).
//! - Equality falls back to structural equality, then to comparing the
//!   textual renderings of the two values.
//! - Ordering on any other combination is an error.

use crate::EngramError;
use serde_json::Value;
use std::cmp::Ordering;

/// Widen any JSON number to `f64` for cross-width comparison.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    value.as_number().and_then(serde_json::Number::as_f64)
}

/// Render a value as text for fallback comparison.
///
/// Strings render without quotes; everything else renders as its JSON
/// form.
#[must_use]
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Type-aware equality.
#[must_use]
pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
        return a == b;
    }
    if let (Value::String(a), Value::String(b)) = (actual, expected) {
        return a == b;
    }
    if actual == expected {
        return true;
    }
    render(actual) == render(expected)
}

/// Type-aware ordering for `gt`/`gte`/`lt`/`lte`.
///
/// Only numeric and string pairs are ordered; anything else is a
/// `BadArgument`.
pub fn compare_order(actual: &Value, expected: &Value) -> Result<Ordering, EngramError> {
    if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
        return Ok(a.total_cmp(&b));
    }
    if let (Value::String(a), Value::String(b)) = (actual, expected) {
        return Ok(a.cmp(b));
    }
    Err(EngramError::BadArgument(format!(
        "cannot order values {} and {}",
        render(actual),
        render(expected)
    )))
}

/// Ordering used by the query engine's sort.
///
/// A missing sort field orders before any present value; present values
/// compare numerically when both sides are numeric, then as strings,
/// then by textual rendering. Never errors, so an unsortable pair simply
/// keeps its stable relative order.
#[must_use]
pub fn sort_ordering(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.total_cmp(&y);
    }
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return x.cmp(y);
    }
    render(a).cmp(&render(b))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_across_widths() {
        assert!(values_equal(&json!(30), &json!(30.0)));
        assert!(values_equal(&json!(-2), &json!(-2.0)));
        assert!(!values_equal(&json!(30), &json!(30.5)));
    }

    #[test]
    fn strings_compare_directly() {
        assert!(values_equal(&json!("abc"), &json!("abc")));
        assert!(!values_equal(&json!("abc"), &json!("abd")));
    }

    #[test]
    fn structural_equality_for_trees() {
        assert!(values_equal(
            &json!({"a": [1, 2]}),
            &json!({"a": [1, 2]})
        ));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 2})));
    }

    #[test]
    fn textual_fallback_bridges_mixed_types() {
        // A boolean against the string "true" matches via rendering.
        assert!(values_equal(&json!(true), &json!("true")));
        assert!(!values_equal(&json!(true), &json!("false")));
    }

    #[test]
    fn ordering_numeric_and_string() {
        assert_eq!(
            compare_order(&json!(2), &json!(10.0)).expect("order"),
            Ordering::Less
        );
        assert_eq!(
            compare_order(&json!("b"), &json!("a")).expect("order"),
            Ordering::Greater
        );
    }

    #[test]
    fn ordering_incompatible_types_errors() {
        assert!(matches!(
            compare_order(&json!(true), &json!(1)),
            Err(EngramError::BadArgument(_))
        ));
        assert!(matches!(
            compare_order(&json!([1]), &json!([2])),
            Err(EngramError::BadArgument(_))
        ));
    }

    #[test]
    fn sort_places_missing_values_first() {
        assert_eq!(sort_ordering(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(sort_ordering(Some(&json!(1)), None), Ordering::Greater);
        assert_eq!(sort_ordering(None, None), Ordering::Equal);
    }

    #[test]
    fn sort_is_numeric_when_both_sides_numeric() {
        assert_eq!(
            sort_ordering(Some(&json!(9)), Some(&json!(10))),
            Ordering::Less
        );
        // String comparison would say "9" > "10".
        assert_eq!(
            sort_ordering(Some(&json!("9")), Some(&json!("10"))),
            Ordering::Greater
        );
    }
}
