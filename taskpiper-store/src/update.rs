//! Update application: `$set`, `$unset`, `$push`, `$pull`.
//!
//! An update document is a JSON object whose keys are all operators; each
//! operator maps field names to operands. Plain (non-`$`) top-level keys
//! are rejected — full-document replacement goes through
//! [`crate::Collection::replace_by_id`] instead. The `id` field is
//! immutable and cannot be touched by any operator.

use serde_json::{Map, Value};

use crate::error::StoreError;

/// Applies `update` to `doc` in place.
///
/// # Errors
///
/// Returns [`StoreError::BadUpdate`] for malformed updates (non-object,
/// empty, plain fields mixed in, `id` modification, `$push`/`$pull` on a
/// non-array field) and [`StoreError::UnknownOperator`] for operators the
/// store does not implement.
pub fn apply(doc: &mut Map<String, Value>, update: &Value) -> Result<(), StoreError> {
    let Some(operators) = update.as_object() else {
        return Err(StoreError::BadUpdate(
            "update must be a JSON object".to_string(),
        ));
    };
    if operators.is_empty() {
        return Err(StoreError::BadUpdate(
            "update must contain at least one operator".to_string(),
        ));
    }
    for (op, fields) in operators {
        if !op.starts_with('$') {
            return Err(StoreError::BadUpdate(format!(
                "update fields must use operators, got plain field {op}"
            )));
        }
        let Some(fields) = fields.as_object() else {
            return Err(StoreError::BadUpdate(format!(
                "{op} requires an object of field/operand pairs"
            )));
        };
        for (field, operand) in fields {
            if field == "id" {
                return Err(StoreError::BadUpdate("id is immutable".to_string()));
            }
            apply_operator(doc, op, field, operand)?;
        }
    }
    Ok(())
}

fn apply_operator(
    doc: &mut Map<String, Value>,
    op: &str,
    field: &str,
    operand: &Value,
) -> Result<(), StoreError> {
    match op {
        "$set" => {
            doc.insert(field.to_string(), operand.clone());
            Ok(())
        }
        "$unset" => {
            doc.remove(field);
            Ok(())
        }
        "$push" => match doc.get_mut(field) {
            Some(Value::Array(items)) => {
                items.push(operand.clone());
                Ok(())
            }
            Some(_) => Err(StoreError::BadUpdate(format!(
                "$push target {field} is not an array"
            ))),
            None => {
                doc.insert(field.to_string(), Value::Array(vec![operand.clone()]));
                Ok(())
            }
        },
        "$pull" => match doc.get_mut(field) {
            Some(Value::Array(items)) => {
                items.retain(|v| v != operand);
                Ok(())
            }
            Some(_) => Err(StoreError::BadUpdate(format!(
                "$pull target {field} is not an array"
            ))),
            // Pulling from a missing array is a no-op.
            None => Ok(()),
        },
        other => Err(StoreError::UnknownOperator(other.to_string())),
    }
}
