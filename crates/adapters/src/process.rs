// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process spawning and signaling (spec.md §4.2 spawn step, §4.2 stop/kill).
//!
//! This module is deliberately free of supervision logic — restart
//! bookkeeping, log capture, and port-wait live in `sandbox-engine`. All
//! this does is turn a [`SpawnSpec`] into a running child in its own
//! process group, and deliver signals to that group later.

use sandbox_core::ProcessError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Characters that force `sh -c command` execution (spec.md §4.2 spawn step).
const SHELL_METACHARACTERS: &[char] = &['&', '|', '>', '<', ';', '$'];

/// Everything needed to start a child process.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub command: String,
    pub working_dir: PathBuf,
    /// Overrides layered onto the daemon's own environment.
    pub env: HashMap<String, String>,
}

/// True if `command` must run under `sh -c` rather than direct exec.
pub fn needs_shell(command: &str) -> bool {
    command.contains(SHELL_METACHARACTERS)
}

/// Split `command` into argv honoring single and double quotes.
///
/// Quotes are stripped from the emitted tokens; nothing inside single
/// quotes is interpreted, and `\"` / `\\` are the only escapes recognized
/// inside double quotes. This is intentionally a small subset of POSIX
/// quoting — full shell grammar is out of scope, since anything needing
/// it should trip [`needs_shell`] instead.
pub fn tokenize_command(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_token = true;
                for inner in chars.by_ref() {
                    if inner == '\'' {
                        break;
                    }
                    current.push(inner);
                }
            }
            '"' => {
                in_token = true;
                while let Some(inner) = chars.next() {
                    match inner {
                        '"' => break,
                        '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                            current.push(chars.next().expect("peeked"));
                        }
                        other => current.push(other),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Build the `tokio::process::Command` for `spec`, choosing shell vs
/// direct-exec per spec.md §4.2, and place the child in its own process
/// group so a later group signal reaches anything it spawns too.
fn build_command(spec: &SpawnSpec) -> Result<Command, ProcessError> {
    let mut cmd = if needs_shell(&spec.command) {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&spec.command);
        cmd
    } else {
        let tokens = tokenize_command(&spec.command);
        let Some((program, args)) = tokens.split_first() else {
            return Err(ProcessError::InvalidRequest("command must not be empty".into()));
        };
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    };

    cmd.current_dir(&spec.working_dir)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    Ok(cmd)
}

/// Spawn `spec` and return the live child with piped stdout/stderr.
pub async fn spawn_child(spec: &SpawnSpec) -> Result<Child, ProcessError> {
    let mut cmd = build_command(spec)?;
    cmd.spawn()
        .map_err(|e| ProcessError::SpawnFailed(e.to_string()))
}

/// Deliver `SIGTERM` (stop) or `SIGKILL` (kill) to the process group
/// rooted at `pid`, falling back to signaling the leader directly if the
/// group itself is gone (spec.md §4.2 stop/kill).
#[cfg(unix)]
pub fn signal_group(pid: u32, kill: bool) -> Result<(), ProcessError> {
    use nix::sys::signal::{kill as signal_pid, killpg, Signal};
    use nix::unistd::Pid;

    let sig = if kill { Signal::SIGKILL } else { Signal::SIGTERM };
    let target = Pid::from_raw(pid as i32);

    match killpg(target, sig) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => signal_pid(target, sig)
            .or(Ok(()))
            .map_err(|e: nix::errno::Errno| ProcessError::NotFound(e.to_string())),
        Err(e) => Err(ProcessError::NotFound(e.to_string())),
    }
}

#[cfg(not(unix))]
pub fn signal_group(_pid: u32, _kill: bool) -> Result<(), ProcessError> {
    Err(ProcessError::SpawnFailed(
        "process-group signaling is only supported on unix".into(),
    ))
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
