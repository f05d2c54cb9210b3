// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Supervisor (spec.md §4.2): owns the registry of
//! [`ProcessRecord`]s and coordinates the OS lifecycle of each.

use crate::log_fanout::{LogEvent, LogFanout};
use parking_lot::Mutex;
use sandbox_adapters::port_event::PortEventAdapter;
use sandbox_adapters::process::{signal_group, spawn_child, SpawnSpec};
use sandbox_core::id::{IdGen, UuidIdGen};
use sandbox_core::{
    time_fmt::now_ms, PortInfo, PortState, ProcessError, ProcessRecord, ProcessStatus,
    RestartPolicy, SpawnRequest,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::sync::{mpsc, watch};

struct Entry {
    record: Mutex<ProcessRecord>,
    fanout: LogFanout,
    done_tx: watch::Sender<bool>,
    stop_requested: AtomicBool,
    kill_requested: AtomicBool,
}

/// Owns every supervised process. Generic over the port-event source so
/// tests can swap in [`sandbox_adapters::FakePortEventAdapter`] and over the
/// id generator so tests get deterministic ids.
pub struct ProcessSupervisor<P: PortEventAdapter, G: IdGen = UuidIdGen> {
    registry: parking_lot::RwLock<HashMap<String, Arc<Entry>>>,
    port_adapter: Arc<P>,
    id_gen: G,
}

impl<P: PortEventAdapter> ProcessSupervisor<P, UuidIdGen> {
    pub fn new(port_adapter: Arc<P>) -> Self {
        Self::with_id_gen(port_adapter, UuidIdGen)
    }
}

impl<P: PortEventAdapter, G: IdGen> ProcessSupervisor<P, G> {
    pub fn with_id_gen(port_adapter: Arc<P>, id_gen: G) -> Self {
        Self {
            registry: parking_lot::RwLock::new(HashMap::new()),
            port_adapter,
            id_gen,
        }
    }

    /// spec.md §4.2 `spawn`.
    pub async fn spawn(&self, request: SpawnRequest) -> Result<ProcessRecord, ProcessError> {
        sandbox_core::validate_request(&request)?;

        let working_dir = request
            .working_dir
            .clone()
            .unwrap_or_else(|| ".".to_string());
        if !std::path::Path::new(&working_dir).is_dir() {
            return Err(ProcessError::WorkingDirMissing(working_dir));
        }

        if let Some(name) = request.name.as_deref().filter(|n| !n.is_empty()) {
            let conflict = {
                let registry = self.registry.read();
                registry.values().any(|e| {
                    let record = e.record.lock();
                    record.name.as_deref() == Some(name) && record.status == ProcessStatus::Running
                })
            };
            if conflict {
                return Err(ProcessError::Conflict(name.to_string()));
            }
        }

        let id = self.id_gen.next();
        let restart_policy = RestartPolicy::from_request(&request);
        let env = merged_env(&request.env);
        let spec = SpawnSpec {
            command: request.command.clone(),
            working_dir: PathBuf::from(&working_dir),
            env: env.clone(),
        };

        let child = spawn_child(&spec).await?;
        let pid = child
            .id()
            .ok_or_else(|| ProcessError::SpawnFailed("child exited before pid was observed".into()))?;

        let record = ProcessRecord {
            id: id.clone(),
            name: request.name.clone(),
            command: request.command.clone(),
            working_dir,
            env,
            restart_policy,
            wait_for_ports: request.wait_for_ports.clone(),
            timeout: request.timeout,
            pid,
            status: ProcessStatus::Running,
            exit_code: None,
            started_at_ms: now_ms(),
            completed_at_ms: None,
            restart_count: 0,
        };

        let (done_tx, _done_rx) = watch::channel(false);
        let entry = Arc::new(Entry {
            record: Mutex::new(record.clone()),
            fanout: LogFanout::new(),
            done_tx,
            stop_requested: AtomicBool::new(false),
            kill_requested: AtomicBool::new(false),
        });

        self.registry.write().insert(id, entry.clone());
        tokio::spawn(supervise(entry, child, spec));

        Ok(record)
    }

    /// spec.md §4.2 `executeSync`.
    pub async fn execute_sync(
        &self,
        request: SpawnRequest,
        timeout: u64,
    ) -> Result<ProcessRecord, ProcessError> {
        let ports_needed: HashSet<u16> = request.wait_for_ports.clone();
        let record = self.spawn(request).await?;
        let entry = self.entry_by_id(&record.id)?;

        if !ports_needed.is_empty() && !self.port_adapter.is_supported() {
            return Ok(entry.record.lock().clone());
        }

        let mut done_rx = entry.done_tx.subscribe();
        if *done_rx.borrow() {
            return Ok(entry.record.lock().clone());
        }

        let mut port_rx = if ports_needed.is_empty() {
            None
        } else {
            let (tx, rx) = mpsc::channel(64);
            self.port_adapter.watch(record.pid, tx);
            Some(rx)
        };
        let mut ports_seen: HashSet<u16> = HashSet::new();

        let timeout_fut = async {
            if timeout > 0 {
                tokio::time::sleep(Duration::from_secs(timeout)).await;
            } else {
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(timeout_fut);

        loop {
            tokio::select! {
                changed = done_rx.changed() => {
                    if changed.is_ok() && *done_rx.borrow() {
                        return Ok(entry.record.lock().clone());
                    }
                }
                _ = &mut timeout_fut => {
                    return Err(ProcessError::Timeout(timeout));
                }
                event = recv_optional(&mut port_rx) => {
                    if let Some(PortInfo { local_port, state: PortState::Open, .. }) = event {
                        ports_seen.insert(local_port);
                        if ports_needed.iter().all(|p| ports_seen.contains(p)) {
                            return Ok(entry.record.lock().clone());
                        }
                    }
                }
            }
        }
    }

    /// spec.md §4.2 `stop`: graceful termination, group then leader fallback.
    pub fn stop(&self, id_or_name: &str) -> Result<(), ProcessError> {
        let entry = self.lookup_entry(id_or_name)?;
        entry.stop_requested.store(true, Ordering::SeqCst);
        signal_group(entry.record.lock().pid, false)
    }

    /// spec.md §4.2 `kill`: forceful termination, group then leader fallback.
    pub fn kill(&self, id_or_name: &str) -> Result<(), ProcessError> {
        let entry = self.lookup_entry(id_or_name)?;
        entry.kill_requested.store(true, Ordering::SeqCst);
        signal_group(entry.record.lock().pid, true)
    }

    pub fn get(&self, id_or_name: &str) -> Option<ProcessRecord> {
        self.lookup_entry(id_or_name)
            .ok()
            .map(|e| e.record.lock().clone())
    }

    pub fn list(&self) -> Vec<ProcessRecord> {
        self.registry
            .read()
            .values()
            .map(|e| e.record.lock().clone())
            .collect()
    }

    /// Evicts the oldest terminal (non-running) records once the registry
    /// holds more than `max_records` entries, so a long-lived agent that
    /// keeps spawning short jobs doesn't grow the in-memory registry
    /// without bound. `max_records == 0` means unbounded; running records
    /// are never evicted regardless of age.
    pub fn reap_terminal(&self, max_records: usize) {
        if max_records == 0 {
            return;
        }
        let mut registry = self.registry.write();
        if registry.len() <= max_records {
            return;
        }
        let mut terminal: Vec<(String, u64)> = registry
            .iter()
            .filter_map(|(id, e)| {
                let record = e.record.lock();
                (record.status != ProcessStatus::Running)
                    .then(|| (id.clone(), record.completed_at_ms.unwrap_or(record.started_at_ms)))
            })
            .collect();
        terminal.sort_by_key(|(_, completed_at)| *completed_at);
        let overflow = registry.len() - max_records;
        for (id, _) in terminal.into_iter().take(overflow) {
            registry.remove(&id);
        }
    }

    pub fn output(&self, id: &str) -> Result<(String, String, String), ProcessError> {
        Ok(self.entry_by_id(id)?.fanout.output())
    }

    /// Returns the replay prefix; `tx` then receives every future event
    /// (spec.md §4.1 `subscribe`).
    pub fn stream(&self, id: &str, tx: mpsc::Sender<LogEvent>) -> Result<String, ProcessError> {
        Ok(self.entry_by_id(id)?.fanout.subscribe(tx))
    }

    /// spec.md §4.3 adoption: register a `running` record recovered from a
    /// snapshot, with `monitor` (built by the caller from the probe result
    /// in `sandbox-storage`) resolving once the adopted OS process actually
    /// exits. Kept free of any direct dependency on `sandbox-storage` so
    /// the layering stays `storage` and `engine` side-by-side under
    /// `daemon`, not `engine` depending on `storage`.
    pub fn adopt_running<F>(&self, record: ProcessRecord, buffer: sandbox_core::LogBuffer, monitor: F)
    where
        F: std::future::Future<Output = (ProcessStatus, i32)> + Send + 'static,
    {
        let id = record.id.clone();
        let (done_tx, _done_rx) = watch::channel(false);
        let entry = Arc::new(Entry {
            record: Mutex::new(record),
            fanout: LogFanout::from_buffer(buffer),
            done_tx,
            stop_requested: AtomicBool::new(false),
            kill_requested: AtomicBool::new(false),
        });
        self.registry.write().insert(id, entry.clone());
        tokio::spawn(async move {
            let (status, exit_code) = monitor.await;
            finish(&entry, status, exit_code);
        });
    }

    /// spec.md §4.3 adoption: restore an already-terminal record as-is, no
    /// monitor fiber needed.
    pub fn restore_terminal(&self, record: ProcessRecord, buffer: sandbox_core::LogBuffer) {
        let id = record.id.clone();
        let (done_tx, _done_rx) = watch::channel(true);
        let entry = Arc::new(Entry {
            record: Mutex::new(record),
            fanout: LogFanout::from_buffer(buffer),
            done_tx,
            stop_requested: AtomicBool::new(false),
            kill_requested: AtomicBool::new(false),
        });
        self.registry.write().insert(id, entry);
    }

    fn entry_by_id(&self, id: &str) -> Result<Arc<Entry>, ProcessError> {
        self.registry
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ProcessError::NotFound(id.to_string()))
    }

    /// spec.md §4.2 `get`: exact id first, then the most-recently-started
    /// record with a matching name.
    fn lookup_entry(&self, id_or_name: &str) -> Result<Arc<Entry>, ProcessError> {
        let registry = self.registry.read();
        if let Some(entry) = registry.get(id_or_name) {
            return Ok(entry.clone());
        }
        registry
            .values()
            .filter(|e| e.record.lock().name.as_deref() == Some(id_or_name))
            .max_by_key(|e| e.record.lock().started_at_ms)
            .cloned()
            .ok_or_else(|| ProcessError::NotFound(id_or_name.to_string()))
    }
}

async fn recv_optional(rx: &mut Option<mpsc::Receiver<PortInfo>>) -> Option<PortInfo> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn merged_env(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    env.extend(overrides.clone());
    env
}

#[cfg(unix)]
fn signal_exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    128 + status.signal().unwrap_or(0)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: &std::process::ExitStatus) -> i32 {
    1
}

async fn drain<R: tokio::io::AsyncRead + Unpin>(
    mut reader: R,
    stream: sandbox_core::LogStream,
    entry: Arc<Entry>,
) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => entry.fanout.append(stream, &buf[..n]),
        }
    }
}

/// The restart loop described in spec.md §4.2 "Execution and restart state
/// machine", steps 2-6. Runs as its own task for the lifetime of the
/// record; on a restart it keeps the same `Entry` (and thus the same
/// LogBuffer and subscribers) and simply swaps in a new child.
async fn supervise(entry: Arc<Entry>, mut child: Child, spec: SpawnSpec) {
    loop {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_entry = entry.clone();
        let err_entry = entry.clone();
        let out_task = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                drain(stdout, sandbox_core::LogStream::Stdout, out_entry).await;
            }
        });
        let err_task = tokio::spawn(async move {
            if let Some(stderr) = stderr {
                drain(stderr, sandbox_core::LogStream::Stderr, err_entry).await;
            }
        });

        let wait_result = child.wait().await;
        let _ = out_task.await;
        let _ = err_task.await;

        let stop_requested = entry.stop_requested.load(Ordering::SeqCst);
        let kill_requested = entry.kill_requested.load(Ordering::SeqCst);

        let exit_code = match &wait_result {
            Ok(status) if status.success() => 0,
            Ok(status) => status.code().unwrap_or_else(|| signal_exit_code(status)),
            Err(_) => 1,
        };

        if stop_requested || kill_requested {
            finish(
                &entry,
                if kill_requested {
                    ProcessStatus::Killed
                } else {
                    ProcessStatus::Stopped
                },
                exit_code,
            );
            return;
        }

        if matches!(&wait_result, Ok(status) if status.success()) {
            finish(&entry, ProcessStatus::Completed, 0);
            return;
        }

        let can_restart = {
            let record = entry.record.lock();
            record.restart_policy.restart_on_failure
                && record.restart_count < record.restart_policy.max_restarts
        };

        if !can_restart {
            finish(&entry, ProcessStatus::Failed, exit_code);
            return;
        }

        entry
            .fanout
            .inject(&format!("Process failed with exit code {exit_code}"));
        tokio::time::sleep(sandbox_adapters::restart_backoff_ms()).await;

        let (attempt, max_restarts) = {
            let mut record = entry.record.lock();
            record.restart_count += 1;
            (record.restart_count, record.restart_policy.max_restarts)
        };
        entry
            .fanout
            .inject(&format!("Process restarting (attempt {attempt}/{max_restarts})"));

        match spawn_child(&spec).await {
            Ok(new_child) => {
                let new_pid = new_child.id().unwrap_or(0);
                entry.record.lock().pid = new_pid;
                child = new_child;
            }
            Err(e) => {
                entry.fanout.push_error(e.to_string());
                finish(&entry, ProcessStatus::Failed, exit_code);
                return;
            }
        }
    }
}

fn finish(entry: &Arc<Entry>, status: ProcessStatus, exit_code: i32) {
    {
        let mut record = entry.record.lock();
        record.status = status;
        record.exit_code = Some(exit_code);
        record.completed_at_ms = Some(now_ms());
    }
    entry.fanout.push_status(status.to_string(), format!("exit code {exit_code}"));
    let _ = entry.done_tx.send(true);
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
