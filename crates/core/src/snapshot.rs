// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk handoff record written by `sandbox-storage` (spec.md §3,
//! `ManagerSnapshot`). This module holds only the data shape; reading,
//! writing, and the adoption loader live in `sandbox-storage` so this crate
//! stays free of filesystem I/O.

use crate::process::{ProcessStatus, RestartPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// A subset of [`crate::ProcessRecord`] plus the file-backed log paths the
/// loader needs to tail-read after adoption (spec.md §4.3 "Log continuity").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    pub id: String,
    pub name: Option<String>,
    pub command: String,
    pub working_dir: String,
    pub env: HashMap<String, String>,
    pub restart_policy: RestartPolicy,
    pub wait_for_ports: BTreeSet<u16>,
    pub timeout: u64,

    pub pid: u32,
    pub status: ProcessStatus,
    pub exit_code: Option<i32>,
    pub started_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub restart_count: u32,

    /// Inlined combined-buffer contents at save time.
    pub combined_log: String,
    pub stdout_log: String,
    pub stderr_log: String,

    /// Paths to any external log files the process wrote directly to, so
    /// the loader can tail-read bytes written since the snapshot.
    #[serde(default)]
    pub stdout_file: Option<String>,
    #[serde(default)]
    pub stderr_file: Option<String>,
    #[serde(default)]
    pub log_file: Option<String>,
}

/// The on-disk handoff record exchanged across a hot upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub processes: HashMap<String, ProcessState>,
}

impl ManagerSnapshot {
    pub fn new(processes: HashMap<String, ProcessState>) -> Self {
        Self {
            version: SNAPSHOT_SCHEMA_VERSION,
            saved_at: Utc::now(),
            processes,
        }
    }

    pub fn running_count(&self) -> usize {
        self.processes
            .values()
            .filter(|p| p.status == ProcessStatus::Running)
            .count()
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
