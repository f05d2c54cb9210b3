//! `/watch/filesystem/*` (spec.md §4.5, §8 universal property 5): a
//! recursive watcher observes files created inside a subdirectory created
//! after the watch started (the "new subtree race").

use crate::prelude::{DaemonOpts, TestDaemon};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::timeout;

async fn collect_until(
    resp: reqwest::Response,
    predicate: impl Fn(&str) -> bool,
    max_wait: Duration,
) -> String {
    let mut body = resp.bytes_stream();
    let mut buffered = String::new();
    let _ = timeout(max_wait, async {
        while let Some(chunk) = body.next().await {
            let chunk = chunk.expect("chunk");
            buffered.push_str(&String::from_utf8_lossy(&chunk));
            if predicate(&buffered) {
                break;
            }
        }
    })
    .await;
    buffered
}

#[tokio::test]
async fn recursive_watch_sees_file_in_subdirectory_created_after_watch_started() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;

    let resp = daemon
        .client()
        .get(daemon.url("/watch/filesystem/./**"))
        .send()
        .await
        .expect("watch request");
    assert_eq!(resp.status(), 200);

    // Give the watcher a moment to finish arming before the race begins.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let new_dir = daemon.fs_root.join("freshly-created");
    std::fs::create_dir_all(&new_dir).expect("mkdir");
    std::fs::write(new_dir.join("inner.txt"), b"race").expect("write inner file");

    let buffered = collect_until(
        resp,
        |buf| buf.contains("inner.txt"),
        Duration::from_secs(5),
    )
    .await;

    assert!(
        buffered.contains("freshly-created"),
        "expected a CREATE event for the new directory itself; got: {buffered}"
    );
    assert!(
        buffered.contains("inner.txt"),
        "expected a synthesized CREATE event for the file inside the raced directory; got: {buffered}"
    );
}

#[tokio::test]
async fn non_recursive_watch_only_sees_direct_children() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;

    let resp = daemon
        .client()
        .get(daemon.url("/watch/filesystem/."))
        .send()
        .await
        .expect("watch request");

    tokio::time::sleep(Duration::from_millis(300)).await;
    std::fs::write(daemon.fs_root.join("top-level.txt"), b"hi").expect("write");

    let buffered = collect_until(
        resp,
        |buf| buf.contains("top-level.txt"),
        Duration::from_secs(5),
    )
    .await;
    assert!(buffered.contains("top-level.txt"));
}
