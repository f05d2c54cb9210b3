// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon (SPEC_FULL.md §11).

use std::path::PathBuf;

/// Where the process-state snapshot is written and read (spec.md §6).
pub fn state_file() -> PathBuf {
    std::env::var("SANDBOX_STATE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp/sandbox-api-process-state.json"))
}

/// Dev-mode marker consulted by the upgrade pipeline's step 1 guard.
pub fn dev_mode_marker() -> Option<String> {
    std::env::var("SANDBOX_DEV_MODE").ok()
}

/// Number of successful hot-upgrades this binary has gone through, carried
/// forward across `exec` by the outgoing process (spec.md §4.3 step 4).
pub fn upgrade_count() -> u32 {
    std::env::var("SANDBOX_UPGRADE_COUNT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// HTTP bind address (default: `0.0.0.0:8080`).
pub fn bind_addr() -> String {
    std::env::var("SANDBOX_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

/// `tracing_subscriber::EnvFilter` directive (default: `info`).
pub fn log_filter() -> String {
    std::env::var("SANDBOX_LOG").unwrap_or_else(|_| "info".to_string())
}

/// Optional non-blocking file sink for logs, in addition to stderr.
pub fn log_file() -> Option<PathBuf> {
    std::env::var("SANDBOX_LOG_FILE").ok().map(PathBuf::from)
}

/// Fixed high port a successor binary is told to bind while it is being
/// validated (spec.md §4.3 step 3; default: `39991`).
pub fn validation_port() -> u16 {
    std::env::var("SANDBOX_VALIDATION_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(39991)
}

/// Cap on terminal (non-running) records kept in the in-memory registry;
/// `0` (the default) means unbounded (SPEC_FULL.md §12 idle reaper).
pub fn max_records() -> usize {
    std::env::var("SANDBOX_MAX_RECORDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Root the Filesystem Core and Watcher are scoped to (default: `/`,
/// matching spec.md §4.4's "URL path tail after the mount prefix").
pub fn filesystem_root() -> PathBuf {
    std::env::var("SANDBOX_FS_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Resolved configuration for one daemon run, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_file: PathBuf,
    pub dev_mode_marker: Option<String>,
    pub upgrade_count: u32,
    pub bind_addr: String,
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
    pub validation_port: u16,
    pub max_records: usize,
    pub filesystem_root: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self {
            state_file: state_file(),
            dev_mode_marker: dev_mode_marker(),
            upgrade_count: upgrade_count(),
            bind_addr: bind_addr(),
            log_filter: log_filter(),
            log_file: log_file(),
            validation_port: validation_port(),
            max_records: max_records(),
            filesystem_root: filesystem_root(),
        }
    }
}
