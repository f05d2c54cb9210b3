//! NDJSON log streaming (spec.md §6 `/process/{id}/logs/stream`, §4.1 frame
//! format): a subscriber attaching mid-run gets the replay prefix then live
//! appends, terminated by a `result` frame.

use crate::prelude::{DaemonOpts, TestDaemon};
use futures_util::StreamExt;
use serde_json::json;

#[tokio::test]
async fn ndjson_stream_replays_then_terminates_with_result() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    let record: serde_json::Value = daemon
        .client()
        .post(daemon.url("/process"))
        .json(&json!({"command": "printf 'one\\ntwo\\n'"}))
        .send()
        .await
        .expect("spawn")
        .json()
        .await
        .expect("json");
    let id = record["id"].as_str().unwrap();

    let resp = daemon
        .client()
        .get(daemon.url(&format!("/process/{id}/logs/stream")))
        .send()
        .await
        .expect("stream request");
    assert_eq!(resp.status(), 200);

    let mut body = resp.bytes_stream();
    let mut buffered = String::new();
    let mut saw_result = false;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.expect("chunk");
        buffered.push_str(&String::from_utf8_lossy(&chunk));
        if buffered.lines().any(|line| {
            serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .is_some_and(|v| v["type"] == "result")
        }) {
            saw_result = true;
            break;
        }
    }

    assert!(saw_result, "stream never emitted a result frame; got: {buffered}");
    assert!(buffered.contains("one"));
    assert!(buffered.contains("two"));
}
