//! Chainable find queries: filter, sort, projection, skip, limit.
//!
//! [`FindQuery`] is returned by [`Collection::find`](crate::Collection::find)
//! and borrows the collection until [`FindQuery::exec`] runs it. Sort specs
//! and projections follow the Mongo conventions the HTTP surface forwards
//! verbatim: `{"field": 1 | -1}` for sort, `{"field": 1}` inclusion or
//! `{"field": 0}` exclusion for projection.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::filter;

/// A pending find operation against a [`Collection`].
#[must_use = "a FindQuery does nothing until exec() is awaited"]
pub struct FindQuery<'a> {
    collection: &'a Collection,
    filter: Value,
    sort: Option<Value>,
    projection: Option<Value>,
    skip: usize,
    limit: Option<usize>,
}

impl<'a> FindQuery<'a> {
    pub(crate) fn new(collection: &'a Collection, filter: Value) -> Self {
        Self {
            collection,
            filter,
            sort: None,
            projection: None,
            skip: 0,
            limit: None,
        }
    }

    /// Sorts results by `spec`, e.g. `{"deadline": 1, "name": -1}`.
    /// Entries apply in order; later keys break ties.
    pub fn sort(mut self, spec: Value) -> Self {
        self.sort = Some(spec);
        self
    }

    /// Projects each result through `projection` before returning it.
    pub fn select(mut self, projection: Value) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Skips the first `n` results (after sorting).
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Caps the number of returned results.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Runs the query and returns the matching documents.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the filter, sort spec, or projection
    /// is malformed.
    pub async fn exec(self) -> Result<Vec<Value>, StoreError> {
        let snapshot = self.collection.snapshot().await;
        let mut docs = Vec::new();
        for doc in snapshot {
            if filter::matches(&doc, &self.filter)? {
                docs.push(doc);
            }
        }
        if let Some(spec) = &self.sort {
            sort_docs(&mut docs, spec)?;
        }
        let mut docs: Vec<Value> = docs
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        if let Some(projection) = &self.projection {
            for doc in &mut docs {
                *doc = project(doc, projection)?;
            }
        }
        Ok(docs)
    }
}

/// Total order over JSON values: type rank first
/// (null < bool < number < string < array < object), then value.
#[must_use]
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(f64::NAN)
            .total_cmp(&y.as_f64().unwrap_or(f64::NAN)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(xa, ya)| cmp_values(xa, ya))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

const fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Stable-sorts `docs` by a `{"field": 1 | -1}` spec. A missing field
/// sorts as `null`, i.e. before every present value when ascending.
fn sort_docs(docs: &mut [Value], spec: &Value) -> Result<(), StoreError> {
    let Some(entries) = spec.as_object() else {
        return Err(StoreError::BadFilter(
            "sort spec must be a JSON object".to_string(),
        ));
    };
    let mut keys = Vec::with_capacity(entries.len());
    for (field, direction) in entries {
        let ascending = match direction.as_i64() {
            Some(1) => true,
            Some(-1) => false,
            _ => {
                return Err(StoreError::BadFilter(format!(
                    "sort direction for {field} must be 1 or -1"
                )));
            }
        };
        keys.push((field.clone(), ascending));
    }
    docs.sort_by(|a, b| {
        for (field, ascending) in &keys {
            let fa = a.get(field).unwrap_or(&Value::Null);
            let fb = b.get(field).unwrap_or(&Value::Null);
            let ord = cmp_values(fa, fb);
            if ord != Ordering::Equal {
                return if *ascending { ord } else { ord.reverse() };
            }
        }
        Ordering::Equal
    });
    Ok(())
}

/// Applies a projection to one document.
///
/// Inclusion mode (`{"field": 1}`) keeps the named fields plus `id`
/// unless `id` is explicitly excluded; exclusion mode (`{"field": 0}`)
/// drops the named fields. Mixing the two (apart from `id`) is an error.
/// An empty projection returns the document unchanged.
///
/// # Errors
///
/// Returns [`StoreError::BadFilter`] for non-object projections, mixed
/// modes, or non-boolean/non-`0|1` values.
pub fn project(doc: &Value, projection: &Value) -> Result<Value, StoreError> {
    let Some(entries) = projection.as_object() else {
        return Err(StoreError::BadFilter(
            "projection must be a JSON object".to_string(),
        ));
    };
    let Some(fields) = doc.as_object() else {
        return Err(StoreError::NotAnObject);
    };
    if entries.is_empty() {
        return Ok(doc.clone());
    }

    let mut flags = Vec::with_capacity(entries.len());
    for (field, flag) in entries {
        let include = match (flag.as_i64(), flag.as_bool()) {
            (Some(1), _) | (_, Some(true)) => true,
            (Some(0), _) | (_, Some(false)) => false,
            _ => {
                return Err(StoreError::BadFilter(format!(
                    "projection value for {field} must be 0 or 1"
                )));
            }
        };
        flags.push((field.as_str(), include));
    }
    let inclusion_mode = flags.iter().any(|(_, include)| *include);
    if inclusion_mode && flags.iter().any(|(f, include)| !include && *f != "id") {
        return Err(StoreError::BadFilter(
            "projection cannot mix inclusion and exclusion".to_string(),
        ));
    }

    let mut out = Map::new();
    if inclusion_mode {
        let id_excluded = flags.contains(&("id", false));
        if !id_excluded
            && let Some(id) = fields.get("id")
        {
            out.insert("id".to_string(), id.clone());
        }
        for (field, include) in flags {
            if include
                && let Some(v) = fields.get(field)
            {
                out.insert(field.to_string(), v.clone());
            }
        }
    } else {
        for (k, v) in fields {
            if !flags.contains(&(k.as_str(), false)) {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    Ok(Value::Object(out))
}
