//! S4 (spec.md §8): `executeSync` timeout leaves the process running.

use crate::prelude::{wait_for_async, DaemonOpts, TestDaemon};
use serde_json::json;
use std::time::Instant;

#[tokio::test]
async fn timeout_leaves_process_running_then_kill_succeeds() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;

    let started = Instant::now();
    let resp = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({
            "command": "sleep 30",
            "name": "survivor",
            "waitForCompletion": true,
            "timeout": 1,
        }))
        .send()
        .await
        .expect("spawn");
    assert_eq!(resp.status(), 422);
    assert!(started.elapsed().as_secs_f64() <= 2.5, "timeout took too long to surface");
    let body: serde_json::Value = resp.json().await.expect("json");
    assert!(body["error"].as_str().unwrap().to_lowercase().contains("timed out"));

    let get_resp: serde_json::Value = daemon
        .client()
        .get(daemon.url("/process/survivor"))
        .send()
        .await
        .expect("get by name")
        .json()
        .await
        .expect("json");
    assert_eq!(get_resp["status"], "running");

    let kill_resp = daemon
        .client()
        .delete(daemon.url("/process/survivor/kill"))
        .send()
        .await
        .expect("kill");
    assert_eq!(kill_resp.status(), 200);

    let client = daemon.client();
    let url = daemon.url("/process/survivor");
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
