//! `GET /health` (spec.md §6).

use crate::prelude::{DaemonOpts, TestDaemon};

#[tokio::test]
async fn health_reports_ok() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let resp = daemon
        .client()
        .get(daemon.url("/health"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "ok");
}
