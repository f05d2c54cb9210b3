//! `/network/process/{pid}/*` (spec.md §6). Out of core scope beyond the
//! pluggable Port-Event Source surface (spec.md §1); this only checks the
//! endpoints are wired and idempotent, not real port detection.

use crate::prelude::{DaemonOpts, TestDaemon};
use serde_json::json;

#[tokio::test]
async fn ports_for_unmonitored_pid_is_an_empty_list() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let ports: Vec<serde_json::Value> = daemon
        .client()
        .get(daemon.url("/network/process/999999/ports"))
        .send()
        .await
        .expect("ports")
        .json()
        .await
        .expect("json");
    assert!(ports.is_empty());
}

#[tokio::test]
async fn monitor_start_and_stop_round_trip() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let record: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "sleep 5", "name": "monitored"}))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");
    let pid = record["pid"].as_u64().unwrap();

    let start = daemon
        .client()
        .post(daemon.url(&format!("/network/process/{pid}/monitor")))
        .json(&json!({}))
        .send()
        .await
        .expect("monitor start");
    assert_eq!(start.status(), 200);

    let stop = daemon
        .client()
        .delete(daemon.url(&format!("/network/process/{pid}/monitor")))
        .send()
        .await
        .expect("monitor stop");
    assert_eq!(stop.status(), 200);

    // Stopping twice is idempotent (no monitor registered the second time).
    let stop_again = daemon
        .client()
        .delete(daemon.url(&format!("/network/process/{pid}/monitor")))
        .send()
        .await
        .expect("monitor stop again");
    assert_eq!(stop_again.status(), 200);

    let id = record["id"].as_str().unwrap();
    let _ = daemon.client().delete(daemon.url(&format!("/process/{id}/kill"))).send().await;
}
