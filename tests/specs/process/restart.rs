//! S1 (spec.md §8): restart-on-failure with eventual success.

use crate::prelude::{DaemonOpts, TestDaemon};
use serde_json::json;

#[tokio::test]
async fn restart_with_eventual_success() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let counter = daemon.fs_root.join("k");
    let command = format!(
        "c=$(cat {path} 2>/dev/null||echo 0); n=$((c+1)); echo $n>{path}; echo Attempt $n; [ $n -lt 3 ] && exit 1 || exit 0",
        path = counter.display()
    );

    let record: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({
            "command": command,
            "waitForCompletion": true,
            "restartOnFailure": true,
            "maxRestarts": 5,
        }))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");

    assert_eq!(record["status"], "completed");
    assert_eq!(record["exitCode"], 0);
    assert_eq!(record["restartCount"], 2);

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
    let combined = logs["logs"].as_str().unwrap();
    for needle in [
        "Attempt 1",
        "Attempt 2",
        "Attempt 3",
        "Process restarting (attempt 1/5)",
        "Process restarting (attempt 2/5)",
    ] {
        assert!(combined.contains(needle), "combined log missing {needle:?}:\n{combined}");
    }
}
