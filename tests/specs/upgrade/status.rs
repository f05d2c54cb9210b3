//! `/upgrade` and `/upgrade/status` (spec.md §4.3, §6).

use crate::prelude::{wait_for_async, DaemonOpts, TestDaemon};
use serde_json::json;

#[tokio::test]
async fn status_starts_idle_with_no_attempt_recorded() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let status: serde_json::Value = daemon
        .client()
        .get(daemon.url("/upgrade/status"))
        .send()
        .await
        .expect("status")
        .json()
        .await
        .expect("json");
    assert!(status["lastAttempt"].is_null());
    assert!(status["error"].is_null());
}

#[tokio::test]
async fn dev_mode_guard_skips_the_upgrade_pipeline() {
    // `TestDaemon::spawn`'s default sets `SANDBOX_DEV_MODE=1` (spec.md §4.3
    // step 1), so any `/upgrade` call here must short-circuit rather than
    // attempt a real download against a URL that does not exist.
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;

    let resp = daemon
        .client()
        .post(daemon.url("/upgrade"))
        .json(&json!({"version": "v999", "baseUrl": "http://127.0.0.1:1/does-not-matter"}))
        .send()
        .await
        .expect("upgrade request");
    assert_eq!(resp.status(), 202);

    let client = daemon.client();
    let url = daemon.url("/upgrade/status");
    let status = wait_for_async(2_000, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let status: serde_json::Value = client.get(url).send().await.ok()?.json().await.ok()?;
            (status["status"] == "skipped").then_some(status)
        }
    })
    .await;

    assert_eq!(status["version"], "v999");
}

#[tokio::test]
async fn unreachable_download_url_is_reflected_as_a_failed_attempt() {
    let mut opts = DaemonOpts::default();
    opts.dev_mode = false;
    let daemon = TestDaemon::spawn(opts).await;

    let resp = daemon
        .client()
        .post(daemon.url("/upgrade"))
        .json(&json!({"version": "v1", "baseUrl": "http://127.0.0.1:1"}))
        .send()
        .await
        .expect("upgrade request");
    assert_eq!(resp.status(), 202);

    let client = daemon.client();
    let url = daemon.url("/upgrade/status");
    let status = wait_for_async(10_000, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let status: serde_json::Value = client.get(url).send().await.ok()?.json().await.ok()?;
            (status["status"] == "failed").then_some(status)
        }
    })
    .await;

    assert!(status["error"].as_str().unwrap_or_default().len() > 0);
}
