//! `/filesystem/tree/{path}` and `/filesystem/find/{path}` (spec.md §4.4).

use crate::prelude::{DaemonOpts, TestDaemon};
use serde_json::json;

async fn seed(daemon: &TestDaemon) {
    for (path, content) in [
        ("/src/main.rs", "fn main() {}"),
        ("/src/lib.rs", "pub fn lib() {}"),
        ("/README.md", "hello"),
        ("/node_modules/pkg/index.js", "module.exports = {}"),
        ("/.hidden", "secret"),
    ] {
        daemon
            .client()
            .put(daemon.url(&format!("/filesystem{path}")))
            .json(&json!({"content": content}))
            .send()
            .await
            .unwrap_or_else(|_| panic!("seed {path}"));
    }
}

#[tokio::test]
async fn tree_lists_files_and_subdirectories() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    seed(&daemon).await;

    let tree: serde_json::Value = daemon
        .client()
        .get(daemon.url("/filesystem/tree/src"))
        .send()
        .await
        .expect("tree")
        .json()
        .await
        .expect("json");

    let files: Vec<&str> = tree["files"].as_array().unwrap().iter().map(|f| f.as_str().unwrap()).collect();
    assert!(files.contains(&"main.rs"));
    assert!(files.contains(&"lib.rs"));
}

#[tokio::test]
async fn find_filters_by_pattern_excludes_node_modules_and_hidden_by_default() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    seed(&daemon).await;

    let results: Vec<String> = daemon
        .client()
        .get(daemon.url("/filesystem/find/.?patterns=*.rs"))
        .send()
        .await
        .expect("find")
        .json()
        .await
        .expect("json");

    assert!(results.iter().any(|p| p.ends_with("main.rs")));
    assert!(results.iter().any(|p| p.ends_with("lib.rs")));
    assert!(!results.iter().any(|p| p.contains("node_modules")));
    assert!(!results.iter().any(|p| p.contains(".hidden")));
}

#[tokio::test]
async fn find_respects_exclude_hidden_false_and_max_results() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;
    seed(&daemon).await;

    let results: Vec<String> = daemon
        .client()
        .get(daemon.url("/filesystem/find/.?excludeHidden=false&maxResults=1"))
        .send()
        .await
        .expect("find")
        .json()
        .await
        .expect("json");

    assert_eq!(results.len(), 1, "maxResults must truncate the result set");
}
