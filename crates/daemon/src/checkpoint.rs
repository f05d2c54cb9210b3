// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds a [`ManagerSnapshot`] from the live registry and saves it on a
//! timer, so a crash between hot-upgrades still leaves a recent handoff
//! record for [`crate::startup::adopt_all`] to load (spec.md §4.3).

use crate::state::AppState;
use sandbox_core::{ManagerSnapshot, ProcessState};
use std::collections::HashMap;
use std::time::Duration;

const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(30);

/// A point-in-time [`ManagerSnapshot`] of every record the supervisor
/// currently holds, terminal or not (spec.md §3 `ManagerSnapshot`).
pub fn build_snapshot(state: &AppState) -> ManagerSnapshot {
    let mut processes = HashMap::new();
    for record in state.supervisor.list() {
        let (stdout_log, stderr_log, combined_log) =
            state.supervisor.output(&record.id).unwrap_or_default();
        processes.insert(
            record.id.clone(),
            ProcessState {
                id: record.id,
                name: record.name,
                command: record.command,
                working_dir: record.working_dir,
                env: record.env,
                restart_policy: record.restart_policy,
                wait_for_ports: record.wait_for_ports,
                timeout: record.timeout,
                pid: record.pid,
                status: record.status,
                exit_code: record.exit_code,
                started_at_ms: record.started_at_ms,
                completed_at_ms: record.completed_at_ms,
                restart_count: record.restart_count,
                combined_log,
                stdout_log,
                stderr_log,
                stdout_file: None,
                stderr_file: None,
                log_file: None,
            },
        );
    }
    ManagerSnapshot::new(processes)
}

/// Background task that periodically persists the registry so the state
/// file stays reasonably fresh between explicit `/upgrade` snapshots.
pub fn spawn_periodic_checkpoint(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(CHECKPOINT_INTERVAL).await;
            let snapshot = build_snapshot(&state);
            if let Err(e) = sandbox_storage::snapshot::save(&state.config.state_file, &snapshot) {
                tracing::warn!(error = %e, "periodic checkpoint failed");
            }
        }
    })
}
