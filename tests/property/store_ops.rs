//! Property-based tests for the document store's consistency-critical
//! operations.
//!
//! Uses proptest to verify:
//! 1. The conditional "push only if absent" update never produces a
//!    duplicate array entry, whatever the invocation sequence.
//! 2. `$pull` removes every occurrence and is idempotent.
//! 3. Arbitrary interleavings of conditional push and pull keep the
//!    array duplicate-free.
//! 4. Sorting returns an ordered permutation of the matched documents.

use proptest::prelude::*;
use serde_json::{Value, json};
use taskpiper_store::Collection;

/// Runs an async store operation to completion on a fresh runtime.
fn run<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
        .block_on(fut)
}

/// Strategy for short lowercase identifiers (with deliberate collisions).
fn arb_id() -> impl Strategy<Value = String> {
    "[a-d][0-9]"
}

/// One step of a pending-list mutation sequence.
#[derive(Debug, Clone)]
enum PendingOp {
    Add(String),
    Remove(String),
}

fn arb_pending_op() -> impl Strategy<Value = PendingOp> {
    prop_oneof![
        arb_id().prop_map(PendingOp::Add),
        arb_id().prop_map(PendingOp::Remove),
    ]
}

async fn pending_of(col: &Collection, id: &str) -> Vec<String> {
    col.find_by_id(id)
        .await
        .and_then(|d| d.get("pendingTasks").cloned())
        .and_then(|v| match v {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default()
}

/// The conditional push used by the consistency engine: push `task_id`
/// only when it is not already present.
async fn conditional_push(col: &Collection, user_id: &str, task_id: &str) {
    col.update_one(
        json!({"id": user_id, "pendingTasks": {"$ne": task_id}}),
        json!({"$push": {"pendingTasks": task_id}}),
    )
    .await
    .expect("conditional push failed");
}

async fn pull(col: &Collection, user_id: &str, task_id: &str) {
    col.update_one(
        json!({"id": user_id}),
        json!({"$pull": {"pendingTasks": task_id}}),
    )
    .await
    .expect("pull failed");
}

proptest! {
    #[test]
    fn conditional_push_never_duplicates(ids in prop::collection::vec(arb_id(), 0..32)) {
        run(async {
            let col = Collection::new("users");
            col.insert_one(json!({"id": "u1", "pendingTasks": []}))
                .await
                .expect("insert failed");

            for id in &ids {
                conditional_push(&col, "u1", id).await;
            }

            let pending = pending_of(&col, "u1").await;
            // Entries equal the distinct pushed ids in first-seen order.
            let mut expected = Vec::new();
            for id in &ids {
                if !expected.contains(id) {
                    expected.push(id.clone());
                }
            }
            prop_assert_eq!(pending, expected);
            Ok(())
        })?;
    }

    #[test]
    fn pull_removes_every_occurrence(seed in prop::collection::vec(arb_id(), 0..16), target in arb_id()) {
        run(async {
            let col = Collection::new("users");
            // Seed the raw list unconditionally, duplicates included.
            col.insert_one(json!({"id": "u1", "pendingTasks": seed}))
                .await
                .expect("insert failed");

            pull(&col, "u1", &target).await;
            let after_once = pending_of(&col, "u1").await;
            prop_assert!(!after_once.contains(&target));

            // Second pull with the same arguments changes nothing.
            pull(&col, "u1", &target).await;
            prop_assert_eq!(pending_of(&col, "u1").await, after_once);
            Ok(())
        })?;
    }

    #[test]
    fn interleaved_ops_keep_list_duplicate_free(ops in prop::collection::vec(arb_pending_op(), 0..48)) {
        run(async {
            let col = Collection::new("users");
            col.insert_one(json!({"id": "u1", "pendingTasks": []}))
                .await
                .expect("insert failed");

            for op in &ops {
                match op {
                    PendingOp::Add(id) => conditional_push(&col, "u1", id).await,
                    PendingOp::Remove(id) => pull(&col, "u1", id).await,
                }
            }

            let pending = pending_of(&col, "u1").await;
            let mut unique = pending.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(pending.len(), unique.len(), "duplicates in {:?}", pending);
            Ok(())
        })?;
    }

    #[test]
    fn sort_returns_ordered_permutation(ns in prop::collection::vec(-1000i64..1000, 0..32)) {
        run(async {
            let col = Collection::new("things");
            for n in &ns {
                col.insert_one(json!({"n": n})).await.expect("insert failed");
            }

            let sorted = col
                .find(json!({}))
                .sort(json!({"n": 1}))
                .exec()
                .await
                .expect("find failed");
            let got: Vec<i64> = sorted
                .iter()
                .filter_map(|d| d.get("n").and_then(Value::as_i64))
                .collect();

            let mut expected = ns.clone();
            expected.sort_unstable();
            prop_assert_eq!(got, expected);
            Ok(())
        })?;
    }

    #[test]
    fn scalar_equality_filter_finds_inserted_doc(value in "[a-z]{1,12}") {
        run(async {
            let col = Collection::new("things");
            col.insert_one(json!({"field": value})).await.expect("insert failed");

            let found = col
                .find(json!({"field": value}))
                .exec()
                .await
                .expect("find failed");
            prop_assert_eq!(found.len(), 1);
            Ok(())
        })?;
    }
}
