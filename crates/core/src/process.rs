// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervised-process entity (spec.md §3, `ProcessRecord`).

use crate::error::ProcessError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Maximum `maxRestarts` a caller may request; `0` is normalized to this.
pub const MAX_RESTARTS_CAP: u32 = 25;

/// Terminal and non-terminal lifecycle states (spec.md §3 Runtime attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Completed,
    Failed,
    Stopped,
    Killed,
}

impl ProcessStatus {
    /// Once reached, no further transitions are permitted (spec.md §3 invariant).
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProcessStatus::Running)
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Completed => "completed",
            ProcessStatus::Failed => "failed",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Killed => "killed",
        };
        write!(f, "{s}")
    }
}

/// Request attributes for `POST /process` (spec.md §3, §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    pub command: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub restart_on_failure: bool,
    /// `0` is normalized to [`MAX_RESTARTS_CAP`] at validation time.
    #[serde(default)]
    pub max_restarts: u32,
    #[serde(default)]
    pub wait_for_ports: BTreeSet<u16>,
    /// Seconds; `0` means no timeout.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub wait_for_completion: bool,
}

/// Normalized restart policy derived from a [`SpawnRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartPolicy {
    pub restart_on_failure: bool,
    pub max_restarts: u32,
}

impl RestartPolicy {
    pub fn from_request(req: &SpawnRequest) -> Self {
        let max_restarts = if req.max_restarts == 0 {
            MAX_RESTARTS_CAP
        } else {
            req.max_restarts.min(MAX_RESTARTS_CAP)
        };
        Self {
            restart_on_failure: req.restart_on_failure,
            max_restarts,
        }
    }
}

/// Validate a [`SpawnRequest`] per spec.md §4.2, independent of filesystem
/// access (the caller still must check `workingDir` exists before spawning).
pub fn validate_request(req: &SpawnRequest) -> Result<(), ProcessError> {
    if req.command.trim().is_empty() {
        return Err(ProcessError::InvalidRequest("command must not be empty".into()));
    }
    if req.max_restarts > MAX_RESTARTS_CAP {
        return Err(ProcessError::InvalidRequest(format!(
            "maxRestarts must be between 0 and {MAX_RESTARTS_CAP}"
        )));
    }
    Ok(())
}

/// The supervised-process entity (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    pub working_dir: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub restart_policy: RestartPolicy,
    #[serde(default)]
    pub wait_for_ports: BTreeSet<u16>,
    /// Seconds; `0` means no timeout.
    #[serde(default)]
    pub timeout: u64,

    pub pid: u32,
    pub status: ProcessStatus,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub started_at_ms: u64,
    #[serde(default)]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub restart_count: u32,
}

impl ProcessRecord {
    /// `restartCount <= maxRestarts` (spec.md Testable Property 3).
    pub fn can_restart(&self) -> bool {
        self.restart_policy.restart_on_failure
            && self.restart_count < self.restart_policy.max_restarts
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
