// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boot-time adoption (spec.md §4.3 "Loader contract"): reload the saved
//! [`sandbox_core::ManagerSnapshot`], reclaim every `running` record whose
//! OS process is still alive, and restore terminal ones as-is.

use crate::state::AppState;
use sandbox_core::{LogBuffer, ProcessRecord, ProcessState, ProcessStatus};
use sandbox_storage::AdoptionOutcome;
use tracing::{info, warn};

/// Runs once at startup. Errors reading the state file are logged and
/// treated as "nothing to adopt" (spec.md §7 *fatal* is reserved for
/// unexpected OS errors, not a missing or corrupt handoff file — the
/// loader itself already degrades a corrupt file to `None`).
pub async fn adopt_all(state: &AppState) {
    let snapshot = match sandbox_storage::snapshot::load(&state.config.state_file) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "failed to read state file, starting with an empty registry");
            return;
        }
    };

    let Some(snapshot) = snapshot else {
        info!("no prior state file found, starting fresh");
        return;
    };

    for process_state in snapshot.processes.into_values() {
        adopt_one(state, process_state).await;
    }
}

async fn adopt_one(state: &AppState, process_state: ProcessState) {
    let id = process_state.id.clone();
    let buffer = tail_continued_buffer(&process_state);

    if process_state.status != ProcessStatus::Running {
        state
            .supervisor
            .restore_terminal(to_record(process_state), buffer);
        return;
    }

    match sandbox_storage::probe(&process_state) {
        AdoptionOutcome::Adopted => {
            info!(id = %id, pid = process_state.pid, "adopted running process");
            let pid = process_state.pid;
            let record = to_record(process_state);
            state.supervisor.adopt_running(record, buffer, async move {
                let reaped = sandbox_storage::wait_for_exit(pid).await;
                let status = if reaped.exit_code == 0 {
                    ProcessStatus::Completed
                } else {
                    ProcessStatus::Failed
                };
                (status, reaped.exit_code)
            });
        }
        AdoptionOutcome::Lost => {
            warn!(id = %id, pid = process_state.pid, "adoption_mismatch: process no longer exists, marking failed");
            let mut record = to_record(process_state);
            record.status = ProcessStatus::Failed;
            record.exit_code = Some(-1);
            record.completed_at_ms = Some(sandbox_core::time_fmt::now_ms());
            state.supervisor.restore_terminal(record, buffer);
        }
    }
}

fn to_record(ps: ProcessState) -> ProcessRecord {
    ProcessRecord {
        id: ps.id,
        name: ps.name,
        command: ps.command,
        working_dir: ps.working_dir,
        env: ps.env,
        restart_policy: ps.restart_policy,
        wait_for_ports: ps.wait_for_ports,
        timeout: ps.timeout,
        pid: ps.pid,
        status: ps.status,
        exit_code: ps.exit_code,
        started_at_ms: ps.started_at_ms,
        completed_at_ms: ps.completed_at_ms,
        restart_count: ps.restart_count,
    }
}

/// spec.md §4.3 "Log continuity after adoption": restore the saved buffer,
/// then tail-read anything written to an external log file past the saved
/// combined-buffer length, falling back to offset 0 if the file is now
/// shorter than expected (rotation).
fn tail_continued_buffer(ps: &ProcessState) -> LogBuffer {
    let offset = ps.combined_log.len() as u64;
    let mut stdout = ps.stdout_log.clone();
    let mut stderr = ps.stderr_log.clone();
    let mut combined = ps.combined_log.clone();

    if let Some(path) = &ps.stdout_file {
        if let Ok(tail) = sandbox_storage::tail_read(std::path::Path::new(path), offset) {
            stdout.push_str(&tail);
            combined.push_str(&tail);
        }
    }
    if let Some(path) = &ps.stderr_file {
        if let Ok(tail) = sandbox_storage::tail_read(std::path::Path::new(path), offset) {
            stderr.push_str(&tail);
            combined.push_str(&tail);
        }
    }
    if let Some(path) = &ps.log_file {
        if let Ok(tail) = sandbox_storage::tail_read(std::path::Path::new(path), offset) {
            combined.push_str(&tail);
        }
    }

    LogBuffer::from_parts(stdout, stderr, combined)
}
