//! Task entity manager.
//!
//! Owns the Task lifecycle (create, read, list, count, full replace,
//! delete) and the Task-side invariants: `name` and `deadline` are
//! required, and a non-empty `assignedUser` must resolve to an existing
//! user before the task write is attempted. After every successful
//! mutation the pending-task index is reconciled through
//! [`crate::pending`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use taskpiper_store::Collection;

use crate::error::ApiError;
use crate::model::{ListParams, Task, TaskPayload, UNASSIGNED, User};
use crate::pending;

/// Manages the `tasks` collection and its side of the reference
/// consistency rules.
pub struct TaskManager {
    tasks: Arc<Collection>,
    users: Arc<Collection>,
}

impl TaskManager {
    /// Creates a manager over the given collections.
    #[must_use]
    pub fn new(tasks: Arc<Collection>, users: Arc<Collection>) -> Self {
        Self { tasks, users }
    }

    /// Creates a task. Requires `name` and `deadline`; resolves and
    /// validates the assignee; records the assignment in the pending
    /// index when the new task is assigned and not completed.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] for missing required fields,
    /// [`ApiError::Reference`] for an unknown `assignedUser`.
    pub async fn create(&self, payload: TaskPayload) -> Result<Task, ApiError> {
        let deadline = required_fields(&payload)?;
        let (assigned_user, assigned_user_name) = self.resolve_assignee(&payload).await?;

        let task = Task {
            // Store-assigned on insert.
            id: String::new(),
            name: payload.name,
            description: payload.description,
            deadline,
            completed: payload.completed,
            assigned_user,
            assigned_user_name,
            date_created: Utc::now(),
        };
        let stored = self
            .tasks
            .insert_one(serde_json::to_value(&task)?)
            .await
            .map_err(ApiError::from_write)?;
        let task: Task = serde_json::from_value(stored)?;

        pending::add_pending(&self.users, &task).await;
        tracing::info!(task_id = %task.id, assigned_user = %task.assigned_user, "task created");
        Ok(task)
    }

    /// Reads one task, optionally projected.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] when the id does not exist.
    pub async fn read(&self, id: &str, select: Option<Value>) -> Result<Value, ApiError> {
        let mut query = self.tasks.find(json!({ "id": id }));
        if let Some(projection) = select {
            query = query.select(projection);
        }
        let mut docs = query.exec().await?;
        docs.pop().ok_or(ApiError::NotFound)
    }

    /// Lists tasks (or counts them when `params.count` is set).
    /// Pass-through query capability; no consistency concerns.
    ///
    /// # Errors
    ///
    /// [`ApiError::Store`] when the filter, sort, or projection is
    /// malformed.
    pub async fn list(&self, params: ListParams) -> Result<Value, ApiError> {
        if params.count {
            let n = self.tasks.count(params.filter).await?;
            return Ok(json!(n));
        }
        let mut query = self.tasks.find(params.filter);
        if let Some(sort) = params.sort {
            query = query.sort(sort);
        }
        if let Some(select) = params.select {
            query = query.select(select);
        }
        if let Some(skip) = params.skip {
            query = query.skip(skip);
        }
        if let Some(limit) = params.limit {
            query = query.limit(limit);
        }
        Ok(Value::Array(query.exec().await?))
    }

    /// Replaces a task wholesale. All mutable fields come from the
    /// payload; `dateCreated` is preserved from the existing record.
    /// Afterward the pending index is reconciled: the previous assignee
    /// loses the entry when the assignee changed or the task is now
    /// completed, and the new assignee gains it when the task is
    /// assigned and open.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] for an unknown id, plus the same
    /// validation and reference errors as [`TaskManager::create`].
    pub async fn replace(&self, id: &str, payload: TaskPayload) -> Result<Task, ApiError> {
        let deadline = required_fields(&payload)?;
        let existing_doc = self.tasks.find_by_id(id).await.ok_or(ApiError::NotFound)?;
        let existing: Task = serde_json::from_value(existing_doc)?;
        let (assigned_user, assigned_user_name) = self.resolve_assignee(&payload).await?;

        let replacement = Task {
            id: existing.id.clone(),
            name: payload.name,
            description: payload.description,
            deadline,
            completed: payload.completed,
            assigned_user,
            assigned_user_name,
            date_created: existing.date_created,
        };
        let stored = self
            .tasks
            .replace_by_id(id, serde_json::to_value(&replacement)?)
            .await
            .map_err(ApiError::from_write)?
            .ok_or(ApiError::NotFound)?;
        let updated: Task = serde_json::from_value(stored)?;

        // Leaving the Assigned state (reassignment, completion, or
        // unassignment) prunes the prior holder's entry; entering it
        // records the new one.
        let old_user = existing.assigned_user;
        if !old_user.is_empty() && (old_user != updated.assigned_user || updated.completed) {
            pending::remove_pending(&self.users, &old_user, &updated.id).await;
        }
        pending::add_pending(&self.users, &updated).await;

        tracing::info!(task_id = %updated.id, assigned_user = %updated.assigned_user, "task replaced");
        Ok(updated)
    }

    /// Deletes a task, pruning it from its assignee's pending index.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] when the id does not exist.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let doc = self.tasks.delete_by_id(id).await.ok_or(ApiError::NotFound)?;
        let task: Task = serde_json::from_value(doc)?;
        pending::remove_pending(&self.users, &task.assigned_user, &task.id).await;
        tracing::info!(task_id = %task.id, "task deleted");
        Ok(())
    }

    /// Resolves the payload's assignee: an empty `assignedUser` passes
    /// through, otherwise the id must name an existing user, and an
    /// absent or placeholder `assignedUserName` is overwritten with the
    /// resolved user's current name.
    async fn resolve_assignee(&self, payload: &TaskPayload) -> Result<(String, String), ApiError> {
        if payload.assigned_user.is_empty() {
            return Ok((String::new(), payload.assigned_user_name.clone()));
        }
        let Some(doc) = self.users.find_by_id(&payload.assigned_user).await else {
            return Err(ApiError::Reference(format!(
                "assignedUser not found: {}",
                payload.assigned_user
            )));
        };
        let user: User = serde_json::from_value(doc)?;
        let name = if payload.assigned_user_name.is_empty()
            || payload.assigned_user_name == UNASSIGNED
        {
            user.name
        } else {
            payload.assigned_user_name.clone()
        };
        Ok((user.id, name))
    }
}

/// Checks the required fields and returns the parsed deadline.
fn required_fields(payload: &TaskPayload) -> Result<DateTime<Utc>, ApiError> {
    match payload.deadline {
        Some(deadline) if !payload.name.is_empty() => Ok(deadline),
        _ => Err(ApiError::Validation(
            "name and deadline are required".to_string(),
        )),
    }
}
