//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur during collection operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A document with the same id already exists in the collection.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// A filter or update used an operator the store does not implement.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    /// The filter, sort, or projection document was malformed.
    #[error("bad filter: {0}")]
    BadFilter(String),
    /// The update document was malformed.
    #[error("bad update: {0}")]
    BadUpdate(String),
    /// The value supplied as a document was not a JSON object.
    #[error("document is not a JSON object")]
    NotAnObject,
    /// The document carried an `id` that is not a string.
    #[error("invalid id: {0}")]
    InvalidId(String),
}
