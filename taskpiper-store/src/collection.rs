//! A single document collection.
//!
//! Documents are JSON objects held in insertion order behind a
//! [`tokio::sync::RwLock`]. Every document carries a string `id`; the
//! collection assigns a UUID v7 on insert when the caller does not supply
//! one. Each method takes the lock once, so individual operations are
//! atomic with respect to each other — there is no cross-collection
//! transaction.

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::filter;
use crate::query::FindQuery;
use crate::update;

/// An in-memory document collection with Mongo-flavored operations.
pub struct Collection {
    name: String,
    docs: RwLock<Vec<Value>>,
}

impl Collection {
    /// Creates a new, empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts one document, assigning a UUID v7 `id` when the document
    /// does not carry a non-empty string id. Returns the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAnObject`] for non-object documents,
    /// [`StoreError::InvalidId`] for a non-string id, and
    /// [`StoreError::DuplicateId`] when the supplied id already exists.
    pub async fn insert_one(&self, doc: Value) -> Result<Value, StoreError> {
        let mut docs = self.docs.write().await;
        let stored = Self::prepare_insert(&docs, doc)?;
        docs.push(stored.clone());
        Ok(stored)
    }

    /// Inserts many documents under one lock acquisition. The whole batch
    /// is validated before anything is stored (all-or-nothing).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Collection::insert_one`]; duplicate ids within
    /// the batch are also rejected.
    pub async fn insert_many(&self, batch: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let mut docs = self.docs.write().await;
        let mut prepared = Vec::with_capacity(batch.len());
        for doc in batch {
            let stored = Self::prepare_insert(&docs, doc)?;
            if let Some(id) = doc_id(&stored)
                && prepared.iter().any(|p| doc_id(p) == Some(id))
            {
                return Err(StoreError::DuplicateId(id.to_string()));
            }
            prepared.push(stored);
        }
        docs.extend(prepared.iter().cloned());
        Ok(prepared)
    }

    /// Returns the document with the given id, if present.
    pub async fn find_by_id(&self, id: &str) -> Option<Value> {
        let docs = self.docs.read().await;
        docs.iter().find(|d| doc_id(d) == Some(id)).cloned()
    }

    /// Starts a find query; chain `sort`/`select`/`skip`/`limit` and
    /// finish with `exec()`.
    pub fn find(&self, filter: Value) -> FindQuery<'_> {
        FindQuery::new(self, filter)
    }

    /// Counts the documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the filter is malformed.
    pub async fn count(&self, filter: Value) -> Result<u64, StoreError> {
        let docs = self.docs.read().await;
        let mut n = 0;
        for doc in docs.iter() {
            if filter::matches(doc, &filter)? {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Applies an operator update to the first document matching `filter`.
    /// Returns the number of documents modified (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the filter or update is malformed.
    pub async fn update_one(&self, filter: Value, update: Value) -> Result<u64, StoreError> {
        self.update_matching(filter, update, true).await
    }

    /// Applies an operator update to every document matching `filter`.
    /// Returns the number of documents modified.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the filter or update is malformed.
    pub async fn update_many(&self, filter: Value, update: Value) -> Result<u64, StoreError> {
        self.update_matching(filter, update, false).await
    }

    async fn update_matching(
        &self,
        filter: Value,
        update: Value,
        first_only: bool,
    ) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let mut modified = 0;
        for doc in docs.iter_mut() {
            if !filter::matches(doc, &filter)? {
                continue;
            }
            let Some(fields) = doc.as_object_mut() else {
                return Err(StoreError::NotAnObject);
            };
            update::apply(fields, &update)?;
            modified += 1;
            if first_only {
                break;
            }
        }
        Ok(modified)
    }

    /// Replaces the document with the given id wholesale, preserving the
    /// id regardless of what the replacement carries. Returns the stored
    /// document, or `None` when no document has that id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAnObject`] for non-object replacements.
    pub async fn replace_by_id(
        &self,
        id: &str,
        replacement: Value,
    ) -> Result<Option<Value>, StoreError> {
        let Value::Object(mut fields) = replacement else {
            return Err(StoreError::NotAnObject);
        };
        fields.insert("id".to_string(), Value::String(id.to_string()));
        let stored = Value::Object(fields);

        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| doc_id(d) == Some(id)) {
            Some(slot) => {
                *slot = stored.clone();
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    /// Removes and returns the document with the given id, if present.
    pub async fn delete_by_id(&self, id: &str) -> Option<Value> {
        let mut docs = self.docs.write().await;
        let index = docs.iter().position(|d| doc_id(d) == Some(id))?;
        Some(docs.remove(index))
    }

    /// Deletes every document matching `filter`, returning the count.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the filter is malformed.
    pub async fn delete_many(&self, filter: Value) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let mut keep = Vec::with_capacity(docs.len());
        let mut removed = 0;
        for doc in docs.drain(..) {
            if filter::matches(&doc, &filter)? {
                removed += 1;
            } else {
                keep.push(doc);
            }
        }
        *docs = keep;
        Ok(removed)
    }

    /// Clones the current documents for query execution.
    pub(crate) async fn snapshot(&self) -> Vec<Value> {
        self.docs.read().await.clone()
    }

    /// Validates a document for insertion against the current contents and
    /// returns it with an `id` guaranteed to be a unique non-empty string.
    fn prepare_insert(existing: &[Value], doc: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = doc else {
            return Err(StoreError::NotAnObject);
        };
        let assign_new = match fields.get("id") {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) if s.is_empty() => true,
            Some(Value::String(s)) => {
                if existing.iter().any(|d| doc_id(d) == Some(s.as_str())) {
                    return Err(StoreError::DuplicateId(s.clone()));
                }
                false
            }
            Some(other) => return Err(StoreError::InvalidId(other.to_string())),
        };
        if assign_new {
            fields.insert("id".to_string(), Value::String(new_id()));
        }
        Ok(Value::Object(fields))
    }
}

/// The string id of a stored document, if it has one.
fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

/// UUID v7 ids are time-ordered, so natural insertion order and id order
/// agree for store-assigned ids.
fn new_id() -> String {
    Uuid::now_v7().to_string()
}
