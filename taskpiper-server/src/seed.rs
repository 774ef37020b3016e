//! Demo data seeding.
//!
//! Clears both collections, inserts a batch of users and tasks (roughly
//! 60% of tasks assigned to a random user), then bulk-syncs each
//! assigned user's `pendingTasks` so the seeded data satisfies the
//! pending-task invariant from the start.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::{Value, json};
use taskpiper_store::{Store, StoreError};

use crate::model::UNASSIGNED;

const SEED_USER_COUNT: usize = 25;
const SEED_TASK_COUNT: usize = 120;

/// Seeds the store with demo users and tasks.
///
/// # Errors
///
/// Returns a [`StoreError`] if any of the bulk writes fail.
pub async fn seed_store(store: &Store) -> Result<(), StoreError> {
    let users = store.collection("users").await;
    let tasks = store.collection("tasks").await;

    users.delete_many(json!({})).await?;
    tasks.delete_many(json!({})).await?;
    tracing::info!("collections cleared");

    let user_batch: Vec<Value> = (1..=SEED_USER_COUNT)
        .map(|i| {
            json!({
                "name": format!("User {i}"),
                "email": format!("user{i}@test.com"),
                "pendingTasks": [],
                "dateCreated": Utc::now(),
            })
        })
        .collect();
    let created_users = users.insert_many(user_batch).await?;
    tracing::info!(count = created_users.len(), "seeded users");

    let mut rng = rand::rng();
    let mut task_batch = Vec::with_capacity(SEED_TASK_COUNT);
    for i in 1..=SEED_TASK_COUNT {
        let (assigned_user, assigned_user_name) = if rng.random_bool(0.6) {
            let user = &created_users[rng.random_range(0..created_users.len())];
            (
                field_str(user, "id").to_string(),
                field_str(user, "name").to_string(),
            )
        } else {
            (String::new(), UNASSIGNED.to_string())
        };
        task_batch.push(json!({
            "name": format!("Task {i}"),
            "description": format!("Auto-generated task #{i}"),
            "deadline": Utc::now() + Duration::days(rng.random_range(7..57)),
            "completed": false,
            "assignedUser": assigned_user,
            "assignedUserName": assigned_user_name,
            "dateCreated": Utc::now(),
        }));
    }
    let created_tasks = tasks.insert_many(task_batch).await?;
    tracing::info!(count = created_tasks.len(), "seeded tasks");

    // Bucket task ids by assignee, then write each user's list in one
    // update so every assignment is indexed.
    let mut buckets: HashMap<String, Vec<String>> = HashMap::new();
    for task in &created_tasks {
        let user_id = field_str(task, "assignedUser");
        if !user_id.is_empty() {
            buckets
                .entry(user_id.to_string())
                .or_default()
                .push(field_str(task, "id").to_string());
        }
    }
    for (user_id, task_ids) in &buckets {
        users
            .update_one(
                json!({ "id": user_id }),
                json!({ "$set": { "pendingTasks": task_ids } }),
            )
            .await?;
    }
    tracing::info!(users = buckets.len(), "synced pendingTasks");

    Ok(())
}

/// String field of a stored document, or `""` when absent.
fn field_str<'a>(doc: &'a Value, field: &str) -> &'a str {
    doc.get(field).and_then(Value::as_str).unwrap_or_default()
}
