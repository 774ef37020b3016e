//! Domain models for Users and Tasks, plus the request payload shapes.
//!
//! Wire field names are camelCase (`pendingTasks`, `assignedUser`, ...);
//! timestamps are RFC 3339. `Task.assignedUser` is the authoritative
//! relationship pointer — an empty string means unassigned —
//! while `assignedUserName` is a display-only denormalized copy and
//! `User.pendingTasks` is a derived index maintained by
//! [`crate::pending`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder shown for tasks with no assignee.
pub const UNASSIGNED: &str = "unassigned";

/// A user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned unique identifier.
    pub id: String,
    pub name: String,
    pub email: String,
    /// Ids of tasks currently assigned to this user and not completed.
    /// Derived state — see [`crate::pending`].
    #[serde(default)]
    pub pending_tasks: Vec<String>,
    /// Immutable creation timestamp, preserved across replaces.
    pub date_created: DateTime<Utc>,
}

/// A task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned unique identifier.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    /// Id of the assigned user; empty string means unassigned.
    #[serde(default)]
    pub assigned_user: String,
    /// Display-only copy of the assignee's name; not authoritative.
    #[serde(default = "unassigned_name")]
    pub assigned_user_name: String,
    /// Immutable creation timestamp, preserved across replaces.
    pub date_created: DateTime<Utc>,
}

/// Client-supplied fields for creating or replacing a user.
///
/// Required fields are validated in [`crate::users::UserManager`] rather
/// than by serde, so a missing `name` yields the API's uniform
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
}

/// Client-supplied fields for creating or replacing a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `None` when absent; a present but malformed value fails
    /// deserialization and surfaces as a validation error.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub assigned_user: String,
    #[serde(default = "unassigned_name")]
    pub assigned_user_name: String,
}

impl Default for TaskPayload {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            deadline: None,
            completed: false,
            assigned_user: String::new(),
            assigned_user_name: unassigned_name(),
        }
    }
}

fn unassigned_name() -> String {
    UNASSIGNED.to_string()
}

/// Parsed list-endpoint query parameters.
#[derive(Debug, Clone)]
pub struct ListParams {
    /// Filter document (`where` parameter); defaults to match-all.
    pub filter: Value,
    pub sort: Option<Value>,
    pub select: Option<Value>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    /// When set, return the matching count instead of the documents.
    pub count: bool,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            filter: Value::Object(serde_json::Map::new()),
            sort: None,
            select: None,
            skip: None,
            limit: None,
            count: false,
        }
    }
}
