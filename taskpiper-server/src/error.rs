//! API error taxonomy and its mapping onto the uniform response envelope.
//!
//! Every handler returns `Result<_, ApiError>`; the [`IntoResponse`]
//! impl turns an error into the `{ "message": ..., "data": ... }`
//! envelope with the matching status code, so no error escapes the
//! operation boundary unwrapped.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use taskpiper_store::StoreError;
use thiserror::Error;

/// Errors surfaced by entity-manager operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),
    /// A referenced user id does not resolve to an existing record.
    #[error("{0}")]
    Reference(String),
    /// The targeted record does not exist.
    #[error("not found")]
    NotFound,
    /// Unexpected store failure on a read path.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Document (de)serialization failure.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl ApiError {
    /// Wraps a store failure from a write path. Write-path store
    /// rejections stem from the client's input (duplicate supplied id,
    /// malformed document), so they surface as validation errors rather
    /// than server errors.
    #[must_use]
    pub fn from_write(err: StoreError) -> Self {
        Self::Validation(err.to_string())
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Reference(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::NotFound => json!({ "message": "Not Found", "data": Value::Null }),
            Self::Validation(detail) | Self::Reference(detail) => {
                json!({ "message": "Bad Request", "data": detail })
            }
            Self::Store(_) | Self::Serialize(_) => {
                json!({ "message": "Server Error", "data": self.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}
