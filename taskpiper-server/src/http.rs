//! HTTP surface: axum router, query-parameter parsing, and the uniform
//! response envelope.
//!
//! Handlers stay thin — they parse the request, call the entity
//! managers, and wrap the result as `{ "message": ..., "data": ... }`.
//! List endpoints accept `where`, `sort`, and `select` as JSON-encoded
//! query parameters plus integer `skip`/`limit` and `count=true`;
//! unparseable values fall back to defaults rather than failing the
//! request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};
use taskpiper_store::Store;

use crate::error::ApiError;
use crate::model::{ListParams, TaskPayload, UserPayload};
use crate::tasks::TaskManager;
use crate::users::UserManager;

/// Shared server state: the two entity managers over one store.
pub struct AppState {
    pub users: UserManager,
    pub tasks: TaskManager,
}

impl AppState {
    /// Builds the managers over the store's `users` and `tasks`
    /// collections.
    pub async fn new(store: &Store) -> Self {
        let users = store.collection("users").await;
        let tasks = store.collection("tasks").await;
        Self {
            users: UserManager::new(Arc::clone(&users), Arc::clone(&tasks)),
            tasks: TaskManager::new(tasks, users),
        }
    }
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/", get(welcome))
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(read_user).put(replace_user).delete(delete_user),
        )
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(read_task).put(replace_task).delete(delete_task),
        )
        .with_state(state)
}

/// Starts the server on the given address with a fresh, empty store.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let store = Store::new();
    let state = Arc::new(AppState::new(&store).await);
    start_server_with_state(addr, state).await
}

/// Starts the server with pre-built state and returns the bound address
/// and a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "api server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Wraps a payload in the uniform response envelope.
fn envelope(message: &str, data: Value) -> Value {
    json!({ "message": message, "data": data })
}

/// Parses the list-endpoint query parameters, logging and ignoring
/// unparseable JSON values.
fn parse_list_params(query: &HashMap<String, String>) -> ListParams {
    ListParams {
        filter: parse_json_param(query.get("where"))
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        sort: parse_json_param(query.get("sort")),
        select: parse_json_param(query.get("select")),
        skip: query.get("skip").and_then(|s| s.parse().ok()),
        limit: query.get("limit").and_then(|s| s.parse().ok()),
        count: query.get("count").is_some_and(|c| c == "true"),
    }
}

fn parse_json_param(raw: Option<&String>) -> Option<Value> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(param = %raw, error = %e, "ignoring unparseable query parameter");
            None
        }
    }
}

async fn welcome() -> Json<Value> {
    Json(envelope("Welcome to taskpiper", Value::Null))
}

// --- User handlers ---

async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let user = state.users.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(envelope("User created", serde_json::to_value(user)?)),
    ))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let data = state.users.list(parse_list_params(&query)).await?;
    Ok(Json(envelope("OK", data)))
}

async fn read_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let select = parse_json_param(query.get("select"));
    let data = state.users.read(&id, select).await?;
    Ok(Json(envelope("OK", data)))
}

async fn replace_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let user = state.users.replace(&id, payload).await?;
    Ok(Json(envelope("OK", serde_json::to_value(user)?)))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.users.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Task handlers ---

async fn create_task(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let task = state.tasks.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(envelope("Task created", serde_json::to_value(task)?)),
    ))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let data = state.tasks.list(parse_list_params(&query)).await?;
    Ok(Json(envelope("OK", data)))
}

async fn read_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let select = parse_json_param(query.get("select"));
    let data = state.tasks.read(&id, select).await?;
    Ok(Json(envelope("OK", data)))
}

async fn replace_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let task = state.tasks.replace(&id, payload).await?;
    Ok(Json(envelope("OK", serde_json::to_value(task)?)))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tasks.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
