//! Ignore-token filtering (spec.md §4.5, §8 universal property 6).

use crate::prelude::{DaemonOpts, TestDaemon};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn ignore_token_suppresses_matching_subtree_but_not_siblings() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;

    let resp = daemon
        .client()
        .get(daemon.url("/watch/filesystem/./**?ignore=node_modules"))
        .send()
        .await
        .expect("watch request");
    let mut body = resp.bytes_stream();

    tokio::time::sleep(Duration::from_millis(300)).await;

    std::fs::create_dir_all(daemon.fs_root.join("node_modules/pkg")).unwrap();
    std::fs::write(daemon.fs_root.join("node_modules/pkg/index.js"), b"ignored").unwrap();
    std::fs::write(daemon.fs_root.join("visible.txt"), b"seen").unwrap();

    let mut buffered = String::new();
    let _ = timeout(Duration::from_secs(5), async {
        while let Some(chunk) = body.next().await {
            let chunk = chunk.expect("chunk");
            buffered.push_str(&String::from_utf8_lossy(&chunk));
            if buffered.contains("visible.txt") {
                break;
            }
        }
    })
    .await;

    assert!(buffered.contains("visible.txt"), "expected the non-ignored file to be reported; got: {buffered}");
    assert!(
        !buffered.contains("index.js") && !buffered.contains("node_modules"),
        "ignore token must suppress the whole subtree; got: {buffered}"
    );
}
