// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy (spec.md §7). Each variant here is a semantic category;
//! the daemon's route layer (not this crate) maps variants onto HTTP status
//! codes. Nothing in `sandbox-core`/`sandbox-engine` knows about HTTP.

use thiserror::Error;

/// Errors raised by the Process Supervisor (spawn/restart/stop/kill/lookup).
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Malformed request: empty command, unknown enum value, missing field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// `name` is already in use by a currently-running record.
    #[error("conflict: process named {0:?} is already running")]
    Conflict(String),
    /// `workingDir` does not exist at spawn time.
    #[error("unprocessable: working directory does not exist: {0}")]
    WorkingDirMissing(String),
    /// `executeSync` exceeded its absolute deadline; the process is left running.
    #[error("timed out waiting for process after {0}s")]
    Timeout(u64),
    /// No record matches the given id or name.
    #[error("not found: {0}")]
    NotFound(String),
    /// The OS refused to start the child process.
    #[error("failed to start process: {0}")]
    SpawnFailed(String),
}

/// Errors raised by the Filesystem Core (read/write/list/delete/tree/find).
#[derive(Debug, Error)]
pub enum FsError {
    /// Path escaped the filesystem root via `..` or was otherwise malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// No file or directory at the given path.
    #[error("not found: {0}")]
    NotFound(String),
    /// Non-recursive delete attempted against a non-empty directory.
    #[error("unprocessable: directory is not empty: {0}")]
    DirectoryNotEmpty(String),
    /// Underlying OS error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the Filesystem Watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Root path does not exist or is not a directory.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// The OS notification backend failed to arm a watch.
    #[error("watch backend error: {0}")]
    Backend(String),
}
