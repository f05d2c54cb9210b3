// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The adoption loader (spec.md §4.3 "Loader contract"): decides, for each
//! `running` record in a loaded [`ProcessState`], whether the OS process it
//! names is still the same process, then hands the engine enough to rebuild
//! a monitor fiber without a live `Child` handle.

use sandbox_core::ProcessState;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

/// What the probe concluded about one recorded `running` process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionOutcome {
    /// The pid is alive and its cmdline still looks like this command.
    Adopted,
    /// The pid is gone, or now belongs to an unrelated command.
    Lost,
}

/// spec.md §4.3: "check whether the recorded OS pid still exists (signal 0
/// probe) AND whether `/proc/<pid>/cmdline` contains the recorded command
/// tail (or the command contains the first token of cmdline)".
pub fn probe(state: &ProcessState) -> AdoptionOutcome {
    if !pid_alive(state.pid) {
        return AdoptionOutcome::Lost;
    }
    match cmdline(state.pid) {
        Some(cmdline) => {
            let command_matches = cmdline
                .split_whitespace()
                .next()
                .is_some_and(|first| state.command.contains(first))
                || state
                    .command
                    .split_whitespace()
                    .next_back()
                    .is_some_and(|tail| cmdline.contains(tail));
            if command_matches {
                AdoptionOutcome::Adopted
            } else {
                AdoptionOutcome::Lost
            }
        }
        // Can't read cmdline (permissions, or a non-Linux host): trust the
        // signal-0 probe alone rather than refusing every adoption.
        None => AdoptionOutcome::Adopted,
    }
}

/// Exit status recovered for an adopted process once it has actually exited.
#[derive(Debug, Clone, Copy)]
pub struct ReapedExit {
    pub exit_code: i32,
}

/// Poll `pid` once per second until it exits (spec.md §4.3 monitor fiber),
/// then reap it with `WNOHANG` to recover its exit code where possible.
pub async fn wait_for_exit(pid: u32) -> ReapedExit {
    loop {
        if !pid_alive(pid) || is_zombie(pid) {
            return ReapedExit {
                exit_code: reap(pid).unwrap_or(128),
            };
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    false
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // Third field after the `(comm)` parenthetical is the state letter.
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .is_some_and(|state| state == "Z")
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}

#[cfg(target_os = "linux")]
fn cmdline(pid: u32) -> Option<String> {
    std::fs::read_to_string(format!("/proc/{pid}/cmdline"))
        .ok()
        .map(|raw| raw.replace('\0', " ").trim().to_string())
}

#[cfg(not(target_os = "linux"))]
fn cmdline(_pid: u32) -> Option<String> {
    None
}

#[cfg(unix)]
fn reap(pid: u32) -> Option<i32> {
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
    use nix::unistd::Pid;
    match waitpid(Pid::from_raw(pid as i32), Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(_, code)) => Some(code),
        Ok(WaitStatus::Signaled(_, signal, _)) => Some(128 + signal as i32),
        _ => None,
    }
}

#[cfg(not(unix))]
fn reap(_pid: u32) -> Option<i32> {
    None
}

/// spec.md §4.3 "Log continuity after adoption": tail-read bytes written
/// past `offset` (the saved buffer's length). A file shorter than `offset`
/// means it was rotated out from under us; fall back to reading it from the
/// start rather than erroring.
///
/// `open`, `stat`, `seek`, and `read` all happen through the same open
/// handle so the length check and the read agree on one snapshot of the
/// file, even if something truncates it between calls.
pub fn tail_read(path: &Path, offset: u64) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let len = file.metadata()?.len();
    let start = if len < offset { 0 } else { offset };
    file.seek(SeekFrom::Start(start))?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
#[path = "adoption_tests.rs"]
mod tests;
