// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process append-only log storage (spec.md §4.1, `LogBuffer`).
//!
//! This type is intentionally synchronous and allocation-only: fan-out to
//! live subscribers (the async part) is orchestrated by `sandbox-engine`,
//! which wraps a `LogBuffer` in a lock and owns the subscriber list. Keeping
//! the buffer itself free of async/I/O lets it be unit tested without a
//! runtime and reused verbatim by the snapshot loader in `sandbox-storage`.

use serde::{Deserialize, Serialize};

/// Which per-process stream a chunk of bytes belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Append-only buffers for one process: separate stdout/stderr plus a
/// combined stream that interleaves both in arrival order and also carries
/// supervisor-injected status lines (spec.md §4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogBuffer {
    stdout: String,
    stderr: String,
    combined: String,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a buffer from a snapshot's inlined strings (spec.md §4.3
    /// adoption), before any further append/inject has happened.
    pub fn from_parts(stdout: String, stderr: String, combined: String) -> Self {
        Self {
            stdout,
            stderr,
            combined,
        }
    }

    /// Append bytes from a child's stdout/stderr. Never fails: invalid UTF-8
    /// is replaced lossily so a misbehaving child can't wedge the buffer.
    pub fn append(&mut self, stream: LogStream, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        match stream {
            LogStream::Stdout => self.stdout.push_str(&text),
            LogStream::Stderr => self.stderr.push_str(&text),
        }
        self.combined.push_str(&text);
    }

    /// Write a supervisor-generated line (restart/failure markers) into the
    /// combined buffer only.
    pub fn inject(&mut self, line: &str) {
        self.combined.push_str(line);
        if !line.ends_with('\n') {
            self.combined.push('\n');
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn combined(&self) -> &str {
        &self.combined
    }

    pub fn combined_len(&self) -> usize {
        self.combined.len()
    }
}

#[cfg(test)]
#[path = "log_buffer_tests.rs"]
mod tests;
