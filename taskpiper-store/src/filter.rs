//! Filter matching with Mongo-flavored semantics.
//!
//! A filter is a JSON object; a document matches when every entry holds.
//! A scalar condition means equality, except against an array field where
//! it means membership (this array-equality rule is what makes conditional
//! "push only if absent" updates expressible as plain filters). A condition
//! may instead be an operator object refining the comparison.

use serde_json::Value;
use std::cmp::Ordering;

use crate::error::StoreError;
use crate::query::cmp_values;

/// Returns whether `doc` satisfies every condition in `filter`.
///
/// # Errors
///
/// Returns [`StoreError::BadFilter`] if the filter is not a JSON object or
/// an operator operand is malformed, and [`StoreError::UnknownOperator`]
/// for operators the store does not implement.
pub fn matches(doc: &Value, filter: &Value) -> Result<bool, StoreError> {
    let Some(conditions) = filter.as_object() else {
        return Err(StoreError::BadFilter(
            "filter must be a JSON object".to_string(),
        ));
    };
    for (field, condition) in conditions {
        if !matches_condition(doc.get(field), condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluates a single field condition: either an operator object (every
/// operator must hold) or a scalar equality/membership test.
fn matches_condition(field: Option<&Value>, condition: &Value) -> Result<bool, StoreError> {
    if let Some(ops) = operator_object(condition) {
        for (op, operand) in ops {
            if !apply_operator(field, op, operand)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    Ok(equals_or_contains(field, condition))
}

/// Returns the entries of `condition` when it is an operator object: a
/// non-empty JSON object whose keys all start with `$`.
fn operator_object(condition: &Value) -> Option<&serde_json::Map<String, Value>> {
    condition
        .as_object()
        .filter(|map| !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
}

/// Scalar equality, or membership when the stored value is an array.
///
/// A condition of `null` also matches a missing field, mirroring Mongo.
fn equals_or_contains(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(|v| v == expected),
        Some(v) => v == expected,
        None => expected.is_null(),
    }
}

fn apply_operator(field: Option<&Value>, op: &str, operand: &Value) -> Result<bool, StoreError> {
    match op {
        "$eq" => Ok(equals_or_contains(field, operand)),
        "$ne" => Ok(!equals_or_contains(field, operand)),
        "$in" => Ok(candidates(op, operand)?
            .iter()
            .any(|c| equals_or_contains(field, c))),
        "$nin" => Ok(!candidates(op, operand)?
            .iter()
            .any(|c| equals_or_contains(field, c))),
        "$gt" => Ok(compare(field, operand) == Some(Ordering::Greater)),
        "$gte" => Ok(matches!(
            compare(field, operand),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        "$lt" => Ok(compare(field, operand) == Some(Ordering::Less)),
        "$lte" => Ok(matches!(
            compare(field, operand),
            Some(Ordering::Less | Ordering::Equal)
        )),
        "$exists" => {
            let want = operand.as_bool().ok_or_else(|| {
                StoreError::BadFilter("$exists requires a boolean operand".to_string())
            })?;
            Ok(field.is_some() == want)
        }
        other => Err(StoreError::UnknownOperator(other.to_string())),
    }
}

/// Operand of `$in`/`$nin`, which must be an array of candidates.
fn candidates<'a>(op: &str, operand: &'a Value) -> Result<&'a Vec<Value>, StoreError> {
    operand
        .as_array()
        .ok_or_else(|| StoreError::BadFilter(format!("{op} requires an array operand")))
}

/// Orders a present field value against an operand; a missing field never
/// satisfies a range comparison.
fn compare(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    field.map(|v| cmp_values(v, operand))
}
