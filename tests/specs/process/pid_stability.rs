//! S2 (spec.md §8): id stability and restart budget exhaustion.

use crate::prelude::{wait_for_async, DaemonOpts, TestDaemon};
use serde_json::json;

#[tokio::test]
async fn exhausts_restart_budget_and_stays_findable_by_name() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let spawned: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({
            "command": "exit 1",
            "name": "x",
            "restartOnFailure": true,
            "maxRestarts": 2,
        }))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");
    let id = spawned["id"].as_str().unwrap().to_string();

    let client = daemon.client();
    let url = daemon.url(&format!("/process/{id}"));
    let final_record = wait_for_async(4_000, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let record: serde_json::Value = client.get(url).send().await.ok()?.json().await.ok()?;
            (record["status"] == "failed").then_some(record)
        }
    })
    .await;

    assert_eq!(final_record["restartCount"], 2);
    assert_eq!(final_record["id"], spawned["id"]);

    let list: Vec<serde_json::Value> = daemon
        .client()
        .get(daemon.url("/process"))
        .send()
        .await
        .expect("list")
        .json()
        .await
        .expect("json");
    let matching: Vec<_> = list.iter().filter(|p| p["name"] == "x").collect();
    assert_eq!(matching.len(), 1, "expected exactly one record named x, got {list:?}");
}
