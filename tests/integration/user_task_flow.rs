//! End-to-end tests for the User/Task reference-consistency rules.
//!
//! Drives a real server over HTTP and verifies that the
//! `Task.assignedUser` pointer and the `User.pendingTasks` index stay
//! mutually consistent across creates, replaces, and deletes on either
//! side.

use serde_json::{Value, json};

/// Starts the API server in-process and returns its base URL.
async fn start_api() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = taskpiper_server::http::start_server("127.0.0.1:0")
        .await
        .expect("failed to start api server");
    (format!("http://{addr}"), handle)
}

async fn create_user(client: &reqwest::Client, base: &str, name: &str) -> Value {
    let res = client
        .post(format!("{base}/api/users"))
        .json(&json!({"name": name, "email": format!("{}@x.com", name.to_lowercase())}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    res.json::<Value>().await.unwrap()["data"].clone()
}

async fn create_task(client: &reqwest::Client, base: &str, body: Value) -> Value {
    let res = client
        .post(format!("{base}/api/tasks"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    res.json::<Value>().await.unwrap()["data"].clone()
}

async fn get_json(client: &reqwest::Client, url: &str) -> Value {
    let res = client.get(url).send().await.unwrap();
    assert_eq!(res.status(), 200);
    res.json::<Value>().await.unwrap()["data"].clone()
}

async fn put_json(client: &reqwest::Client, url: &str, body: Value) -> Value {
    let res = client.put(url).json(&body).send().await.unwrap();
    assert_eq!(res.status(), 200);
    res.json::<Value>().await.unwrap()["data"].clone()
}

fn pending_tasks(user: &Value) -> Vec<String> {
    user["pendingTasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

const FUTURE: &str = "2030-01-01T00:00:00Z";

#[tokio::test]
async fn assigned_create_appears_in_pending() {
    // Scenario A: create user, create assigned task, pendingTasks
    // reflects it.
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let alice_id = alice["id"].as_str().unwrap();

    let task = create_task(
        &client,
        &base,
        json!({"name": "T1", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    assert_eq!(task["assignedUserName"], json!("Alice"));

    let alice = get_json(&client, &format!("{base}/api/users/{alice_id}")).await;
    assert_eq!(pending_tasks(&alice), vec![task["id"].as_str().unwrap()]);
}

#[tokio::test]
async fn completing_task_clears_pending() {
    // Scenario B: replacing the task as completed (same assignee)
    // removes it from pendingTasks.
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let alice_id = alice["id"].as_str().unwrap();
    let task = create_task(
        &client,
        &base,
        json!({"name": "T1", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    put_json(
        &client,
        &format!("{base}/api/tasks/{task_id}"),
        json!({
            "name": "T1",
            "deadline": FUTURE,
            "completed": true,
            "assignedUser": alice_id,
        }),
    )
    .await;

    let alice = get_json(&client, &format!("{base}/api/users/{alice_id}")).await;
    assert!(pending_tasks(&alice).is_empty());
}

#[tokio::test]
async fn reassignment_moves_pending_entry() {
    // Scenario C: reassigning a task moves its id between users'
    // pendingTasks lists.
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let bob = create_user(&client, &base, "Bob").await;
    let alice_id = alice["id"].as_str().unwrap();
    let bob_id = bob["id"].as_str().unwrap();

    let task = create_task(
        &client,
        &base,
        json!({"name": "T2", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    let updated = put_json(
        &client,
        &format!("{base}/api/tasks/{task_id}"),
        json!({"name": "T2", "deadline": FUTURE, "assignedUser": bob_id}),
    )
    .await;
    assert_eq!(updated["assignedUserName"], json!("Bob"));

    let alice = get_json(&client, &format!("{base}/api/users/{alice_id}")).await;
    let bob = get_json(&client, &format!("{base}/api/users/{bob_id}")).await;
    assert!(!pending_tasks(&alice).contains(&task_id.to_string()));
    assert!(pending_tasks(&bob).contains(&task_id.to_string()));
}

#[tokio::test]
async fn deleting_user_orphans_tasks() {
    // Scenario D: deleting a user clears its tasks' assignee fields.
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let alice_id = alice["id"].as_str().unwrap();
    let task = create_task(
        &client,
        &base,
        json!({"name": "T1", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    let res = client
        .delete(format!("{base}/api/users/{alice_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let task = get_json(&client, &format!("{base}/api/tasks/{task_id}")).await;
    assert_eq!(task["assignedUser"], json!(""));
    assert_eq!(task["assignedUserName"], json!("unassigned"));
}

#[tokio::test]
async fn user_replace_claims_named_task() {
    // Scenario E: naming an unowned task in pendingTasks claims it.
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let bob = create_user(&client, &base, "Bob").await;
    let bob_id = bob["id"].as_str().unwrap();
    let stray = create_task(&client, &base, json!({"name": "T3", "deadline": FUTURE})).await;
    let stray_id = stray["id"].as_str().unwrap();
    assert_eq!(stray["assignedUser"], json!(""));

    put_json(
        &client,
        &format!("{base}/api/users/{bob_id}"),
        json!({"name": "Bob", "email": "bob@x.com", "pendingTasks": [stray_id]}),
    )
    .await;

    let task = get_json(&client, &format!("{base}/api/tasks/{stray_id}")).await;
    assert_eq!(task["assignedUser"], json!(bob_id));
    assert_eq!(task["completed"], json!(false));
}

#[tokio::test]
async fn user_replace_drops_unnamed_tasks() {
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let alice_id = alice["id"].as_str().unwrap();
    let task = create_task(
        &client,
        &base,
        json!({"name": "T1", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    // Replace Alice without the task in the desired set.
    put_json(
        &client,
        &format!("{base}/api/users/{alice_id}"),
        json!({"name": "Alice", "email": "alice@x.com", "pendingTasks": []}),
    )
    .await;

    let task = get_json(&client, &format!("{base}/api/tasks/{task_id}")).await;
    assert_eq!(task["assignedUser"], json!(""));
    assert_eq!(task["assignedUserName"], json!("unassigned"));
}

#[tokio::test]
async fn deleting_task_prunes_pending() {
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let alice_id = alice["id"].as_str().unwrap();
    let task = create_task(
        &client,
        &base,
        json!({"name": "T1", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    let res = client
        .delete(format!("{base}/api/tasks/{task_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let alice = get_json(&client, &format!("{base}/api/users/{alice_id}")).await;
    assert!(pending_tasks(&alice).is_empty());
}

#[tokio::test]
async fn unassigning_task_round_trip() {
    // Round-trip property: assign on create, unassign on replace.
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let alice_id = alice["id"].as_str().unwrap();
    let task = create_task(
        &client,
        &base,
        json!({"name": "T1", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    let alice = get_json(&client, &format!("{base}/api/users/{alice_id}")).await;
    assert_eq!(pending_tasks(&alice), vec![task_id.to_string()]);

    put_json(
        &client,
        &format!("{base}/api/tasks/{task_id}"),
        json!({"name": "T1", "deadline": FUTURE, "assignedUser": ""}),
    )
    .await;

    let alice = get_json(&client, &format!("{base}/api/users/{alice_id}")).await;
    assert!(pending_tasks(&alice).is_empty());
}

#[tokio::test]
async fn create_task_with_unknown_assignee_rejected() {
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/tasks"))
        .json(&json!({"name": "T", "deadline": FUTURE, "assignedUser": "ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], json!("Bad Request"));

    // No partial write: the task list is still empty.
    let tasks = get_json(&client, &format!("{base}/api/tasks")).await;
    assert_eq!(tasks, json!([]));
}

#[tokio::test]
async fn task_replace_preserves_date_created() {
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let task = create_task(&client, &base, json!({"name": "T", "deadline": FUTURE})).await;
    let task_id = task["id"].as_str().unwrap();
    let created_at = task["dateCreated"].clone();

    let updated = put_json(
        &client,
        &format!("{base}/api/tasks/{task_id}"),
        json!({"name": "T v2", "deadline": FUTURE, "dateCreated": "1999-01-01T00:00:00Z"}),
    )
    .await;
    assert_eq!(updated["dateCreated"], created_at);
    assert_eq!(updated["name"], json!("T v2"));
}

#[tokio::test]
async fn concurrent_reassignments_leave_consistent_index() {
    // Two conflicting reassignments of the same task race; whichever
    // write lands last owns the task, and the idempotent pending ops
    // leave no stale duplicate entries for the winner.
    let (base, _handle) = start_api().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "Alice").await;
    let bob = create_user(&client, &base, "Bob").await;
    let carol = create_user(&client, &base, "Carol").await;
    let alice_id = alice["id"].as_str().unwrap().to_string();
    let bob_id = bob["id"].as_str().unwrap().to_string();
    let carol_id = carol["id"].as_str().unwrap().to_string();

    let task = create_task(
        &client,
        &base,
        json!({"name": "T", "deadline": FUTURE, "assignedUser": alice_id}),
    )
    .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    let to_bob = json!({"name": "T", "deadline": FUTURE, "assignedUser": bob_id});
    let to_carol = json!({"name": "T", "deadline": FUTURE, "assignedUser": carol_id});
    let url = format!("{base}/api/tasks/{task_id}");
    let (ra, rb) = tokio::join!(
        client.put(&url).json(&to_bob).send(),
        client.put(&url).json(&to_carol).send(),
    );
    assert_eq!(ra.unwrap().status(), 200);
    assert_eq!(rb.unwrap().status(), 200);

    let task = get_json(&client, &url).await;
    let owner = task["assignedUser"].as_str().unwrap().to_string();
    assert!(owner == bob_id || owner == carol_id);

    // The final owner's list contains the task exactly once.
    let owner_doc = get_json(&client, &format!("{base}/api/users/{owner}")).await;
    let owner_pending = pending_tasks(&owner_doc);
    assert_eq!(
        owner_pending.iter().filter(|t| **t == task_id).count(),
        1,
        "winner's pendingTasks must contain the task exactly once"
    );
}
