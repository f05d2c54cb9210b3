//! Spawn/list/get/stop/kill basics and the §7 error taxonomy for `/process`.

use crate::prelude::{wait_for_async, DaemonOpts, TestDaemon};
use serde_json::json;

#[tokio::test]
async fn spawn_runs_to_completion_and_is_listed() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let resp = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "true", "waitForCompletion": true}))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    let record: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(record["status"], "completed");
    assert_eq!(record["exitCode"], 0);

    let list: Vec<serde_json::Value> = daemon
        .client()
        .get(daemon.url("/process"))
        .send()
        .await
        .expect("list")
        .json()
        .await
        .expect("json");
    assert!(list.iter().any(|p| p["id"] == record["id"]));
}

#[tokio::test]
async fn empty_command_is_rejected() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let resp = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": ""}))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn missing_working_dir_is_unprocessable() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let resp = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "true", "workingDir": "/does/not/exist/at/all"}))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn duplicate_running_name_conflicts() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let first = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "sleep 5", "name": "dup"}))
        .send()
        .await
        .expect("first spawn");
    assert_eq!(first.status(), 200);

    let second = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "sleep 5", "name": "dup"}))
        .send()
        .await
        .expect("second spawn");
    assert_eq!(second.status(), 409);
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let resp = daemon
        .client()
        .get(daemon.url("/process/no-such-id"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn stop_transitions_to_stopped_and_kill_to_killed() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let record: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "sleep 30", "name": "stoppable"}))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");
    let id = record["id"].as_str().unwrap().to_string();

    let stop_resp = daemon
        .client()
        .delete(daemon.url(&format!("/process/{id}")))
        .send()
        .await
        .expect("stop");
    assert_eq!(stop_resp.status(), 200);

    let client = daemon.client();
    let url = daemon.url(&format!("/process/{id}"));
    wait_for_async(2_000, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let record: serde_json::Value = client.get(url).send().await.ok()?.json().await.ok()?;
            (record["status"] == "stopped").then_some(())
        }
    })
    .await;

    let killable: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "sleep 30", "name": "killable"}))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");
    let kid = killable["id"].as_str().unwrap().to_string();

    let kill_resp = daemon
        .client()
        .delete(daemon.url(&format!("/process/{kid}/kill")))
        .send()
        .await
        .expect("kill");
    assert_eq!(kill_resp.status(), 200);

    let client = daemon.client();
    let url = daemon.url(&format!("/process/{kid}"));
    wait_for_async(2_000, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let record: serde_json::Value = client.get(url).send().await.ok()?.json().await.ok()?;
            (record["status"] == "killed").then_some(())
        }
    })
    .await;
}

#[tokio::test]
async fn logs_endpoint_returns_combined_output() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let record: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "echo hello-from-logs", "waitForCompletion": true}))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");
    let id = record["id"].as_str().unwrap();

    let logs: serde_json::Value = daemon
        .client()
        .get(daemon.url(&format!("/process/{id}/logs")))
        .send()
        .await
        .expect("logs")
        .json()
        .await
        .expect("json");
    assert!(logs["stdout"].as_str().unwrap().contains("hello-from-logs"));
    assert!(logs["logs"].as_str().unwrap().contains("hello-from-logs"));
}
