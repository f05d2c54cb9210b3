// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port-Event Source (spec.md §2, §4.2 `waitForPorts`).
//!
//! "Abstract feed of `(pid, local_port, opened|closed)` events" — on Linux
//! this is a poller over `/proc/net/tcp{,6}` cross-referenced against the
//! pid's open file descriptors; everywhere else it's a [`NoOpPortAdapter`]
//! that never fires, matching the spec's documented degradation ("on
//! platforms where it is unavailable, `executeSync` returns immediately
//! after spawn without waiting").

use parking_lot::Mutex;
use sandbox_core::{PortInfo, PortState};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A background feed of port open/close events for a single pid.
///
/// `watch` returns immediately; events for `pid` are delivered on `tx`
/// until the child exits or the receiving end is dropped. One watch task
/// runs per supervised process (spec.md §5 scheduling model).
pub trait PortEventAdapter: Send + Sync + 'static {
    fn watch(&self, pid: u32, tx: mpsc::Sender<PortInfo>);

    /// Whether this adapter can actually observe ports on the current
    /// platform. The engine skips `waitForPorts` entirely when false.
    fn is_supported(&self) -> bool {
        true
    }
}

/// Polls `/proc/net/tcp` and `/proc/net/tcp6`, attributing listening
/// sockets to `pid` via `/proc/<pid>/fd/*` inode symlinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcNetTcpAdapter {
    poll_interval: std::time::Duration,
}

impl ProcNetTcpAdapter {
    pub fn new(poll_interval: std::time::Duration) -> Self {
        Self { poll_interval }
    }
}

impl PortEventAdapter for ProcNetTcpAdapter {
    fn watch(&self, pid: u32, tx: mpsc::Sender<PortInfo>) {
        let interval = self.poll_interval;
        tokio::spawn(async move {
            let mut known: HashSet<u16> = HashSet::new();
            loop {
                if !pid_alive(pid) {
                    break;
                }
                let current = listening_ports_for_pid(pid).unwrap_or_default();

                for &port in current.difference(&known) {
                    if tx
                        .send(PortInfo {
                            pid,
                            local_port: port,
                            state: PortState::Open,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                for &port in known.difference(&current) {
                    if tx
                        .send(PortInfo {
                            pid,
                            local_port: port,
                            state: PortState::Closed,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                known = current;
                tokio::time::sleep(interval).await;
            }
        });
    }
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    false
}

/// Inode numbers of sockets held open by `pid`'s file descriptors.
#[cfg(target_os = "linux")]
fn socket_inodes_for_pid(pid: u32) -> std::io::Result<HashSet<u64>> {
    let mut inodes = HashSet::new();
    let fd_dir = format!("/proc/{pid}/fd");
    for entry in std::fs::read_dir(fd_dir)? {
        let Ok(entry) = entry else { continue };
        let Ok(target) = std::fs::read_link(entry.path()) else {
            continue;
        };
        let Some(name) = target.to_str() else { continue };
        if let Some(inode) = name.strip_prefix("socket:[").and_then(|s| s.strip_suffix(']')) {
            if let Ok(inode) = inode.parse() {
                inodes.insert(inode);
            }
        }
    }
    Ok(inodes)
}

/// `st_state` value for `TCP_LISTEN` in `/proc/net/tcp`'s hex dump.
const TCP_LISTEN_STATE: &str = "0A";

#[cfg(target_os = "linux")]
fn listening_ports_from_table(contents: &str, inodes: &HashSet<u64>) -> HashSet<u16> {
    let mut ports = HashSet::new();
    for line in contents.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // local_address is field 1, st (state) is field 3, inode is field 9.
        let (Some(local_address), Some(state), Some(inode)) =
            (fields.get(1), fields.get(3), fields.get(9))
        else {
            continue;
        };
        if *state != TCP_LISTEN_STATE {
            continue;
        }
        let Ok(inode) = inode.parse::<u64>() else {
            continue;
        };
        if !inodes.contains(&inode) {
            continue;
        }
        let Some((_, port_hex)) = local_address.split_once(':') else {
            continue;
        };
        if let Ok(port) = u16::from_str_radix(port_hex, 16) {
            ports.insert(port);
        }
    }
    ports
}

#[cfg(target_os = "linux")]
fn listening_ports_for_pid(pid: u32) -> std::io::Result<HashSet<u16>> {
    let inodes = socket_inodes_for_pid(pid)?;
    let mut ports = HashSet::new();
    for path in ["/proc/net/tcp", "/proc/net/tcp6"] {
        if let Ok(contents) = std::fs::read_to_string(path) {
            ports.extend(listening_ports_from_table(&contents, &inodes));
        }
    }
    Ok(ports)
}

#[cfg(not(target_os = "linux"))]
fn listening_ports_for_pid(_pid: u32) -> std::io::Result<HashSet<u16>> {
    Ok(HashSet::new())
}

/// Degenerate adapter for platforms without a `/proc/net/tcp`-shaped source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPortAdapter;

impl PortEventAdapter for NoOpPortAdapter {
    fn watch(&self, _pid: u32, _tx: mpsc::Sender<PortInfo>) {}

    fn is_supported(&self) -> bool {
        false
    }
}

/// Test double: emits exactly the events pushed onto it via [`Self::push`],
/// in order, regardless of which `pid` was asked for.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct FakePortEventAdapter {
    queued: Arc<Mutex<Vec<PortInfo>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakePortEventAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: PortInfo) {
        self.queued.lock().push(event);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl PortEventAdapter for FakePortEventAdapter {
    fn watch(&self, _pid: u32, tx: mpsc::Sender<PortInfo>) {
        let queued = self.queued.clone();
        tokio::spawn(async move {
            let events = std::mem::take(&mut *queued.lock());
            for event in events {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "port_event_tests.rs"]
mod tests;
