//! S3 (spec.md §8): `waitForPorts` returns only after the port opens.

use crate::prelude::{free_port, DaemonOpts, TestDaemon};
use serde_json::json;
use std::time::Instant;

#[tokio::test]
#[cfg_attr(not(target_os = "linux"), ignore = "waitForPorts needs /proc/net/tcp")]
async fn wait_for_ports_blocks_until_port_opens() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let port = free_port();

    let started = Instant::now();
    let record: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({
            "command": format!("sleep 2 && python3 -m http.server {port}"),
            "waitForPorts": [port],
            "timeout": 30,
        }))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");

    assert!(started.elapsed().as_secs_f64() >= 1.5, "returned before the port could plausibly be open");
    assert_eq!(record["status"], "running");

    let probe = daemon
        .client()
        .get(format!("http://127.0.0.1:{port}/"))
        .send()
        .await
        .expect("probe the now-open port");
    assert!(probe.status().is_success() || probe.status().is_redirection());

    let id = record["id"].as_str().unwrap();
    let _ = daemon
        .client()
        .delete(daemon.url(&format!("/process/{id}/kill")))
        .send()
        .await;
}
