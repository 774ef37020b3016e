//! Reference-consistency primitives for the pending-task index.
//!
//! `User.pendingTasks` is a derived index over the authoritative
//! `Task.assignedUser` pointers. These two operations are the only
//! Task-side-triggered mutators of that index; both are idempotent, so
//! the retries and races described in the concurrency model cannot
//! corrupt it. Failures are logged and swallowed — the primary entity
//! write is never rolled back on account of the index.

use serde_json::json;
use taskpiper_store::Collection;

use crate::model::Task;

/// Adds `task.id` to the assignee's `pendingTasks`.
///
/// No-op when the task has no assignee or is completed. The push is
/// conditional on the id not being present already, so invoking this
/// twice with the same task cannot produce a duplicate entry.
pub async fn add_pending(users: &Collection, task: &Task) {
    if task.assigned_user.is_empty() || task.completed {
        return;
    }
    let filter = json!({
        "id": task.assigned_user,
        "pendingTasks": { "$ne": task.id },
    });
    let update = json!({ "$push": { "pendingTasks": task.id } });
    if let Err(e) = users.update_one(filter, update).await {
        tracing::warn!(
            task_id = %task.id,
            user_id = %task.assigned_user,
            error = %e,
            "add_pending failed; pending index may lag until the next mutation"
        );
    }
}

/// Removes `task_id` from `user_id`'s `pendingTasks`.
///
/// No-op when either argument is empty; removing an id that is not
/// present is also a no-op.
pub async fn remove_pending(users: &Collection, user_id: &str, task_id: &str) {
    if user_id.is_empty() || task_id.is_empty() {
        return;
    }
    let filter = json!({ "id": user_id });
    let update = json!({ "$pull": { "pendingTasks": task_id } });
    if let Err(e) = users.update_one(filter, update).await {
        tracing::warn!(
            task_id = %task_id,
            user_id = %user_id,
            error = %e,
            "remove_pending failed; pending index may lag until the next mutation"
        );
    }
}
