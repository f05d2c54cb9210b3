//! `sandboxctl`, the operator CLI (spec.md §6 surface via a thin client).

use crate::prelude::{sandboxctl_path, DaemonOpts, TestDaemon};
use assert_cmd::Command;

#[tokio::test]
async fn health_subcommand_reports_ok_against_a_running_daemon() {
    let daemon = TestDaemon::spawn(DaemonOpts::default()).await;

    let assert = Command::new(sandboxctl_path())
        .arg("--url")
        .arg(&daemon.base_url)
        .arg("health")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("\"ok\""), "unexpected output: {stdout}");
}

#[test]
fn help_lists_every_top_level_subcommand() {
    let assert = Command::new(sandboxctl_path()).arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    for name in ["process", "fs", "watch", "network", "upgrade", "health"] {
        assert!(stdout.contains(name), "--help missing {name:?}:\n{stdout}");
    }
}
