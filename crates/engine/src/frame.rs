// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming Frame Writer (spec.md §2, §4.1): the one event model shared by
//! NDJSON responses and WebSocket text frames. Nothing here knows about
//! HTTP or WebSockets — `sandbox-daemon` just serializes a [`Frame`] and
//! writes the bytes to whichever transport the request asked for.

use crate::log_fanout::LogEvent;
use sandbox_adapters::RawWatchKind;
use serde::Serialize;
use serde_json::Value;

/// A `/process` stream event (spec.md §4.1 frame format).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Stdout { log: String, name: Option<String>, pid: u32 },
    Stderr { log: String, name: Option<String>, pid: u32 },
    Status { status: String, message: String },
    Result { data: Value },
    Error { message: String },
}

impl Frame {
    /// Build the frame for one [`LogEvent`] as seen by a subscriber to
    /// process `pid` (and optionally `name`). Supervisor-injected marker
    /// lines are reported as `stdout`, since they exist only in the
    /// combined buffer a subscriber is already following.
    pub fn from_log_event(event: &LogEvent, name: Option<&str>, pid: u32) -> Option<Frame> {
        let name = name.map(str::to_string);
        Some(match event {
            LogEvent::Stdout(log) | LogEvent::Injected(log) => Frame::Stdout {
                log: log.clone(),
                name,
                pid,
            },
            LogEvent::Stderr(log) => Frame::Stderr {
                log: log.clone(),
                name,
                pid,
            },
            LogEvent::Status { status, message } => Frame::Status {
                status: status.clone(),
                message: message.clone(),
            },
            LogEvent::Result(data) => Frame::Result { data: data.clone() },
            LogEvent::Error(message) => Frame::Error {
                message: message.clone(),
            },
        })
    }

    /// One NDJSON line, `\n`-terminated. A WebSocket sender uses the same
    /// JSON payload without the trailing newline.
    pub fn to_ndjson_line(&self) -> String {
        format!("{}\n", serde_json::to_string(self).unwrap_or_default())
    }
}

/// A filesystem-watch event (spec.md §4.5): `{op, name, path}`.
#[derive(Debug, Clone, Serialize)]
pub struct WatchFrame {
    pub op: WatchOp,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

impl From<RawWatchKind> for WatchOp {
    fn from(kind: RawWatchKind) -> Self {
        match kind {
            RawWatchKind::Create => WatchOp::Create,
            RawWatchKind::Write => WatchOp::Write,
            RawWatchKind::Remove => WatchOp::Remove,
            RawWatchKind::Rename => WatchOp::Rename,
            RawWatchKind::Chmod => WatchOp::Chmod,
        }
    }
}

impl WatchFrame {
    pub fn to_ndjson_line(&self) -> String {
        format!("{}\n", serde_json::to_string(self).unwrap_or_default())
    }

    /// The "human-friendly keepalive-free plain line" variant for the
    /// non-recursive endpoint's backwards-compatible NDJSON (spec.md §4.5:
    /// "containing at least the base path and the file name in the line
    /// body").
    pub fn to_plain_line(&self, base_path: &str) -> String {
        format!("{base_path} {}\n", self.name)
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
