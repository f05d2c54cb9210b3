// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state handed to every axum handler (SPEC_FULL.md §10 "owns the
//! process registry and upgrade engine as shared state").

use crate::env::Config;
use parking_lot::Mutex;
use sandbox_core::{PortInfo, UpgradeStatus};
use sandbox_engine::{FilesystemCore, ProcessSupervisor, WatchService};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// On Linux, ports are observed via `/proc/net/tcp`; elsewhere `waitForPorts`
/// degrades to "return immediately" (spec.md §4.2, §9).
#[cfg(target_os = "linux")]
pub type PortAdapter = sandbox_adapters::ProcNetTcpAdapter;
#[cfg(not(target_os = "linux"))]
pub type PortAdapter = sandbox_adapters::NoOpPortAdapter;

pub type Supervisor = ProcessSupervisor<PortAdapter>;

#[cfg(target_os = "linux")]
fn default_port_adapter() -> PortAdapter {
    PortAdapter::new(sandbox_adapters::port_poll_ms())
}

#[cfg(not(target_os = "linux"))]
fn default_port_adapter() -> PortAdapter {
    PortAdapter::default()
}

/// A live `POST /network/process/{pid}/monitor` subscription: the
/// background task draining the port-event source for `pid`, plus the
/// most recently observed ports so `GET .../ports` has something to return
/// between events (spec.md §6, out-of-core-scope port enumeration surface).
pub struct PortMonitor {
    pub handle: JoinHandle<()>,
    pub ports: Arc<Mutex<Vec<PortInfo>>>,
}

pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    /// Same adapter `supervisor` uses internally; kept here too since the
    /// supervisor has no accessor for it and `/network/process/{pid}/monitor`
    /// needs to start its own independent watch (spec.md §6).
    pub port_adapter: Arc<PortAdapter>,
    pub fs: Arc<FilesystemCore>,
    pub watch: Arc<WatchService<sandbox_adapters::fs_watch::NotifyFsWatchAdapter>>,
    pub upgrade_status: Arc<Mutex<UpgradeStatus>>,
    /// Single-flight guard for `/upgrade` (spec.md §5: "only one upgrade
    /// attempt may run; concurrent requests see busy").
    pub upgrade_lock: Arc<tokio::sync::Mutex<()>>,
    pub port_monitors: Arc<Mutex<HashMap<u32, PortMonitor>>>,
    pub config: Arc<Config>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            supervisor: self.supervisor.clone(),
            port_adapter: self.port_adapter.clone(),
            fs: self.fs.clone(),
            watch: self.watch.clone(),
            upgrade_status: self.upgrade_status.clone(),
            upgrade_lock: self.upgrade_lock.clone(),
            port_monitors: self.port_monitors.clone(),
            config: self.config.clone(),
        }
    }
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let port_adapter = Arc::new(default_port_adapter());
        let fs_adapter = Arc::new(sandbox_adapters::fs_watch::NotifyFsWatchAdapter);
        Self {
            supervisor: Arc::new(ProcessSupervisor::new(port_adapter.clone())),
            port_adapter,
            fs: Arc::new(FilesystemCore::new(config.filesystem_root.clone())),
            watch: Arc::new(WatchService::new(fs_adapter)),
            upgrade_status: Arc::new(Mutex::new(UpgradeStatus::default())),
            upgrade_lock: Arc::new(tokio::sync::Mutex::new(())),
            port_monitors: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }
}
