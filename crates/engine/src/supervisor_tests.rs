// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sandbox_adapters::{FakePortEventAdapter, NoOpPortAdapter};
use sandbox_core::id::SequentialIdGen;
use std::time::Duration;
use tempfile::TempDir;

fn request(command: &str) -> SpawnRequest {
    SpawnRequest {
        command: command.to_string(),
        working_dir: Some(std::env::temp_dir().display().to_string()),
        ..Default::default()
    }
}

fn noop_supervisor() -> ProcessSupervisor<NoOpPortAdapter, SequentialIdGen> {
    ProcessSupervisor::with_id_gen(Arc::new(NoOpPortAdapter), SequentialIdGen::new("p"))
}

async fn wait_for_terminal<P: PortEventAdapter, G: IdGen>(
    supervisor: &ProcessSupervisor<P, G>,
    id: &str,
) -> ProcessRecord {
    for _ in 0..200 {
        if let Some(record) = supervisor.get(id) {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("process {id} never reached a terminal state");
}

#[tokio::test]
async fn spawn_runs_command_to_completion() {
    let supervisor = noop_supervisor();
    let record = supervisor.spawn(request("echo hello")).await.expect("spawn");
    let finished = wait_for_terminal(&supervisor, &record.id).await;

    assert_eq!(finished.status, ProcessStatus::Completed);
    assert_eq!(finished.exit_code, Some(0));
    let (stdout, _, _) = supervisor.output(&record.id).expect("output");
    assert!(stdout.contains("hello"));
}

#[tokio::test]
async fn spawn_rejects_empty_command() {
    let supervisor = noop_supervisor();
    let err = supervisor.spawn(request("   ")).await.unwrap_err();
    assert!(matches!(err, ProcessError::InvalidRequest(_)));
}

#[tokio::test]
async fn spawn_rejects_missing_working_dir() {
    let supervisor = noop_supervisor();
    let mut req = request("echo hi");
    req.working_dir = Some("/this/path/does/not/exist".to_string());
    let err = supervisor.spawn(req).await.unwrap_err();
    assert!(matches!(err, ProcessError::WorkingDirMissing(_)));
}

#[tokio::test]
async fn spawn_conflicts_on_duplicate_running_name() {
    let supervisor = noop_supervisor();
    let mut req = request("sleep 5");
    req.name = Some("worker".to_string());
    let first = supervisor.spawn(req.clone()).await.expect("first spawn");

    let err = supervisor.spawn(req).await.unwrap_err();
    assert!(matches!(err, ProcessError::Conflict(_)));

    supervisor.kill(&first.id).expect("cleanup");
}

#[tokio::test]
async fn stop_transitions_running_process_to_stopped() {
    let supervisor = noop_supervisor();
    let record = supervisor.spawn(request("sleep 30")).await.expect("spawn");
    supervisor.stop(&record.id).expect("stop");

    let finished = wait_for_terminal(&supervisor, &record.id).await;
    assert_eq!(finished.status, ProcessStatus::Stopped);
}

#[tokio::test]
async fn kill_transitions_running_process_to_killed() {
    let supervisor = noop_supervisor();
    let record = supervisor.spawn(request("sleep 30")).await.expect("spawn");
    supervisor.kill(&record.id).expect("kill");

    let finished = wait_for_terminal(&supervisor, &record.id).await;
    assert_eq!(finished.status, ProcessStatus::Killed);
}

#[tokio::test]
async fn get_by_name_resolves_to_most_recently_started() {
    let supervisor = noop_supervisor();
    let mut req = request("echo one");
    req.name = Some("named".to_string());
    let first = supervisor.spawn(req.clone()).await.expect("spawn first");
    wait_for_terminal(&supervisor, &first.id).await;

    req.command = "echo two".to_string();
    let second = supervisor.spawn(req).await.expect("spawn second");
    wait_for_terminal(&supervisor, &second.id).await;

    let resolved = supervisor.get("named").expect("lookup by name");
    assert_eq!(resolved.id, second.id);
}

#[tokio::test]
async fn restart_on_failure_eventually_succeeds_and_tags_logs() {
    let dir = TempDir::new().expect("tempdir");
    let counter = dir.path().join("attempts");
    let command = format!(
        "c=$(cat {path} 2>/dev/null || echo 0); n=$((c+1)); echo $n>{path}; echo Attempt $n; [ $n -lt 3 ] && exit 1 || exit 0",
        path = counter.display()
    );

    let supervisor = noop_supervisor();
    let mut req = request(&command);
    req.restart_on_failure = true;
    req.max_restarts = 5;

    let record = supervisor
        .execute_sync(req, 0)
        .await
        .expect("execute_sync");

    assert_eq!(record.status, ProcessStatus::Completed);
    assert_eq!(record.exit_code, Some(0));
    assert_eq!(record.restart_count, 2);

    let (_, _, combined) = supervisor.output(&record.id).expect("output");
    assert!(combined.contains("Attempt 1"));
    assert!(combined.contains("Attempt 2"));
    assert!(combined.contains("Attempt 3"));
    assert!(combined.contains("Process restarting (attempt 1/5)"));
    assert!(combined.contains("Process restarting (attempt 2/5)"));
}

#[tokio::test]
async fn execute_sync_times_out_but_leaves_process_running() {
    let supervisor = noop_supervisor();
    let mut req = request("sleep 5");
    req.timeout = 1;

    let err = supervisor.execute_sync(req, 1).await.unwrap_err();
    assert!(matches!(err, ProcessError::Timeout(1)));

    let record = supervisor.get_running_for_test();
    assert_eq!(record.status, ProcessStatus::Running);

    supervisor.kill(&record.id).expect("cleanup");
}

#[tokio::test]
async fn execute_sync_waits_for_all_requested_ports_to_open() {
    let port_adapter = Arc::new(FakePortEventAdapter::new());
    port_adapter.push(PortInfo {
        pid: 0,
        local_port: 3000,
        state: PortState::Open,
    });
    port_adapter.push(PortInfo {
        pid: 0,
        local_port: 3001,
        state: PortState::Open,
    });

    let supervisor = ProcessSupervisor::with_id_gen(port_adapter, SequentialIdGen::new("p"));
    let mut req = request("sleep 2");
    req.wait_for_ports = [3000u16, 3001u16].into_iter().collect();

    let record = supervisor
        .execute_sync(req, 30)
        .await
        .expect("execute_sync");
    assert_eq!(record.status, ProcessStatus::Running);
    supervisor.kill(&record.id).expect("cleanup");
}

#[tokio::test]
async fn adopt_running_replays_the_saved_buffer_and_completes_via_the_monitor() {
    let supervisor = noop_supervisor();
    let mut record = supervisor
        .spawn(request("echo seed"))
        .await
        .expect("spawn seed");
    wait_for_terminal(&supervisor, &record.id).await;

    record.id = "adopted-1".to_string();
    record.status = ProcessStatus::Running;
    record.exit_code = None;
    let buffer =
        sandbox_core::LogBuffer::from_parts("saved out\n".into(), String::new(), "saved out\n".into());

    supervisor.adopt_running(record.clone(), buffer, async { (ProcessStatus::Completed, 0) });

    let finished = wait_for_terminal(&supervisor, "adopted-1").await;
    assert_eq!(finished.status, ProcessStatus::Completed);
    assert_eq!(finished.exit_code, Some(0));
    let (stdout, _, _) = supervisor.output("adopted-1").expect("output");
    assert_eq!(stdout, "saved out\n");
}

#[tokio::test]
async fn restore_terminal_registers_an_already_finished_record() {
    let supervisor = noop_supervisor();
    let mut record = supervisor
        .spawn(request("echo seed"))
        .await
        .expect("spawn seed");
    wait_for_terminal(&supervisor, &record.id).await;

    record.id = "terminal-1".to_string();
    record.status = ProcessStatus::Failed;
    record.exit_code = Some(-1);
    let buffer = sandbox_core::LogBuffer::from_parts(String::new(), String::new(), String::new());

    supervisor.restore_terminal(record, buffer);

    let restored = supervisor.get("terminal-1").expect("restored record");
    assert_eq!(restored.status, ProcessStatus::Failed);
    assert_eq!(restored.exit_code, Some(-1));
}

#[tokio::test]
async fn reap_terminal_evicts_oldest_terminal_records_once_over_the_cap() {
    let supervisor = noop_supervisor();
    let mut ids = Vec::new();
    for i in 0..4 {
        let record = supervisor
            .spawn(request(&format!("echo seed{i}")))
            .await
            .expect("spawn seed");
        wait_for_terminal(&supervisor, &record.id).await;
        ids.push(record.id);
        // completed_at_ms has millisecond resolution; space spawns out so the
        // eviction order below is deterministic rather than tie-broken by
        // hash-map iteration order.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    supervisor.reap_terminal(2);

    assert_eq!(supervisor.list().len(), 2);
    assert!(supervisor.get(&ids[0]).is_none());
    assert!(supervisor.get(&ids[1]).is_none());
    assert!(supervisor.get(&ids[2]).is_some());
    assert!(supervisor.get(&ids[3]).is_some());
}

#[tokio::test]
async fn reap_terminal_never_evicts_running_processes() {
    let supervisor = noop_supervisor();
    let running = supervisor.spawn(request("sleep 5")).await.expect("spawn");
    let finished = supervisor.spawn(request("echo seed")).await.expect("spawn");
    wait_for_terminal(&supervisor, &finished.id).await;

    supervisor.reap_terminal(1);

    assert!(supervisor.get(&running.id).is_some());
    supervisor.kill(&running.id).expect("cleanup");
}

#[tokio::test]
async fn reap_terminal_is_a_no_op_when_unbounded() {
    let supervisor = noop_supervisor();
    let record = supervisor.spawn(request("echo seed")).await.expect("spawn");
    wait_for_terminal(&supervisor, &record.id).await;

    supervisor.reap_terminal(0);

    assert!(supervisor.get(&record.id).is_some());
}

impl<P: PortEventAdapter, G: IdGen> ProcessSupervisor<P, G> {
    /// Test helper: the single running record, for tests with exactly one.
    fn get_running_for_test(&self) -> ProcessRecord {
        self.list()
            .into_iter()
            .find(|r| r.status == ProcessStatus::Running)
            .expect("a running record")
    }
}
