//! User entity manager.
//!
//! Owns the User lifecycle and the User-side consistency rules. The one
//! sanctioned "set desired state" entry point for the pending index is
//! the full replace: the supplied `pendingTasks` list is treated as the
//! desired set of task ids assigned to this user, and the `tasks`
//! collection is reconciled against it in both directions.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use taskpiper_store::Collection;

use crate::error::ApiError;
use crate::model::{ListParams, UNASSIGNED, User, UserPayload};

/// Manages the `users` collection and its side of the reference
/// consistency rules.
pub struct UserManager {
    users: Arc<Collection>,
    tasks: Arc<Collection>,
}

impl UserManager {
    /// Creates a manager over the given collections.
    #[must_use]
    pub fn new(users: Arc<Collection>, tasks: Arc<Collection>) -> Self {
        Self { users, tasks }
    }

    /// Creates a user. Requires `name` and `email`. The supplied
    /// `pendingTasks` list is trusted as given — creation is the only
    /// time the index is accepted without reconciliation.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] for missing required fields.
    pub async fn create(&self, payload: UserPayload) -> Result<User, ApiError> {
        required_fields(&payload)?;
        let user = User {
            // Store-assigned on insert.
            id: String::new(),
            name: payload.name,
            email: payload.email,
            pending_tasks: payload.pending_tasks,
            date_created: Utc::now(),
        };
        let stored = self
            .users
            .insert_one(serde_json::to_value(&user)?)
            .await
            .map_err(ApiError::from_write)?;
        let user: User = serde_json::from_value(stored)?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Reads one user, optionally projected.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] when the id does not exist.
    pub async fn read(&self, id: &str, select: Option<Value>) -> Result<Value, ApiError> {
        let mut query = self.users.find(json!({ "id": id }));
        if let Some(projection) = select {
            query = query.select(projection);
        }
        let mut docs = query.exec().await?;
        docs.pop().ok_or(ApiError::NotFound)
    }

    /// Lists users (or counts them when `params.count` is set).
    ///
    /// # Errors
    ///
    /// [`ApiError::Store`] when the filter, sort, or projection is
    /// malformed.
    pub async fn list(&self, params: ListParams) -> Result<Value, ApiError> {
        if params.count {
            let n = self.users.count(params.filter).await?;
            return Ok(json!(n));
        }
        let mut query = self.users.find(params.filter);
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

    /// Replaces a user wholesale, preserving `dateCreated`, then
    /// reconciles the `tasks` collection against the supplied
    /// `pendingTasks` as the desired assignment set:
    ///
    /// 1. every task currently pointing at this user but absent from the
    ///    list is unassigned;
    /// 2. every task named in the list is pointed at this user and
    ///    re-opened, even one that belonged to a different user or was
    ///    completed.
    ///
    /// This is a full-overwrite reconciliation, not an incremental diff —
    /// it is the bulk-reassignment mechanism of the API.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] for missing required fields,
    /// [`ApiError::NotFound`] for an unknown id.
    pub async fn replace(&self, id: &str, payload: UserPayload) -> Result<User, ApiError> {
        required_fields(&payload)?;
        let prev_doc = self.users.find_by_id(id).await.ok_or(ApiError::NotFound)?;
        let prev: User = serde_json::from_value(prev_doc)?;

        let replacement = User {
            id: prev.id,
            name: payload.name,
            email: payload.email,
            pending_tasks: payload.pending_tasks,
            date_created: prev.date_created,
        };
        let stored = self
            .users
            .replace_by_id(id, serde_json::to_value(&replacement)?)
            .await
            .map_err(ApiError::from_write)?
            .ok_or(ApiError::NotFound)?;
        let user: User = serde_json::from_value(stored)?;

        // Desired set: the supplied list, deduplicated, order-preserving.
        let mut want: Vec<String> = Vec::with_capacity(user.pending_tasks.len());
        for task_id in &user.pending_tasks {
            if !want.contains(task_id) {
                want.push(task_id.clone());
            }
        }

        // Tasks the caller dropped from the list are silently unassigned.
        let orphaned = self
            .tasks
            .update_many(
                json!({ "assignedUser": user.id, "id": { "$nin": want } }),
                json!({ "$set": { "assignedUser": "", "assignedUserName": UNASSIGNED } }),
            )
            .await
            .map_err(ApiError::from_write)?;

        // Tasks named in the list are claimed and re-opened, wherever
        // they pointed before.
        let claimed = self
            .tasks
            .update_many(
                json!({ "id": { "$in": want } }),
                json!({ "$set": {
                    "assignedUser": user.id,
                    "assignedUserName": user.name,
                    "completed": false,
                } }),
            )
            .await
            .map_err(ApiError::from_write)?;

        tracing::info!(
            user_id = %user.id,
            orphaned = orphaned,
            claimed = claimed,
            "user replaced, task assignments reconciled"
        );
        Ok(user)
    }

    /// Deletes a user and orphans (not deletes) every task that pointed
    /// at it: `assignedUser` cleared, `assignedUserName` reset to the
    /// placeholder.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] when the id does not exist.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let doc = self.users.delete_by_id(id).await.ok_or(ApiError::NotFound)?;
        let user: User = serde_json::from_value(doc)?;

        let orphaned = self
            .tasks
            .update_many(
                json!({ "assignedUser": user.id }),
                json!({ "$set": { "assignedUser": "", "assignedUserName": UNASSIGNED } }),
            )
            .await
            .map_err(ApiError::from_write)?;

        tracing::info!(user_id = %user.id, orphaned = orphaned, "user deleted");
        Ok(())
    }
}

/// Checks the required fields of a user payload.
fn required_fields(payload: &UserPayload) -> Result<(), ApiError> {
    if payload.name.is_empty() || payload.email.is_empty() {
        return Err(ApiError::Validation(
            "name and email are required".to_string(),
        ));
    }
    Ok(())
}
