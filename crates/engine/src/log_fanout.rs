// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log Buffer & Fan-out (spec.md §4.1).
//!
//! Wraps a [`sandbox_core::LogBuffer`] in a lock and adds the async part the
//! core type deliberately leaves out: a list of live subscribers that get
//! every chunk appended after they attach, plus a replay of everything
//! buffered before they attached. The replay-then-live handoff holds the
//! buffer lock across both the snapshot read and subscriber registration,
//! so no byte can be lost or duplicated from a subscriber's perspective.

use parking_lot::Mutex;
use sandbox_core::{LogBuffer, LogStream};
use serde_json::Value;
use tokio::sync::mpsc;

/// One event destined for a live subscriber of a process's output stream.
#[derive(Debug, Clone)]
pub enum LogEvent {
    Stdout(String),
    Stderr(String),
    /// A supervisor-generated marker line (spec.md §4.1 `inject`). These
    /// only ever land in the combined buffer, so subscribers following the
    /// combined stream see them tagged the same as stdout chunks.
    Injected(String),
    Status { status: String, message: String },
    Result(Value),
    Error(String),
}

struct State {
    buffer: LogBuffer,
    subscribers: Vec<mpsc::Sender<LogEvent>>,
}

/// Per-process fan-out of stdout/stderr/status/result/error events to any
/// number of concurrent subscribers (spec.md §4.1).
pub struct LogFanout {
    state: Mutex<State>,
}

impl Default for LogFanout {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFanout {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                buffer: LogBuffer::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Start from an already-populated buffer (spec.md §4.3 adoption
    /// restores the saved buffer before any live appends resume).
    pub fn from_buffer(buffer: LogBuffer) -> Self {
        Self {
            state: Mutex::new(State {
                buffer,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Append already-decoded text without touching the stdout/stderr
    /// split (spec.md §4.3 "tail-read... since the snapshot" continuity).
    pub fn append_text(&self, stream: LogStream, text: &str) {
        self.append(stream, text.as_bytes());
    }

    /// Append raw child output. Called from the reader fibers attached to
    /// the child's stdout/stderr; never blocks on a slow subscriber.
    pub fn append(&self, stream: LogStream, bytes: &[u8]) {
        let mut state = self.state.lock();
        state.buffer.append(stream, bytes);
        let text = String::from_utf8_lossy(bytes).into_owned();
        let event = match stream {
            LogStream::Stdout => LogEvent::Stdout(text),
            LogStream::Stderr => LogEvent::Stderr(text),
        };
        Self::broadcast(&mut state.subscribers, event);
    }

    /// Write a supervisor-generated marker into the combined buffer and
    /// notify subscribers (spec.md §4.1 `inject`).
    pub fn inject(&self, line: &str) {
        let mut state = self.state.lock();
        state.buffer.inject(line);
        Self::broadcast(&mut state.subscribers, LogEvent::Injected(line.to_string()));
    }

    pub fn push_status(&self, status: impl Into<String>, message: impl Into<String>) {
        let mut state = self.state.lock();
        Self::broadcast(
            &mut state.subscribers,
            LogEvent::Status {
                status: status.into(),
                message: message.into(),
            },
        );
    }

    pub fn push_result(&self, data: Value) {
        let mut state = self.state.lock();
        Self::broadcast(&mut state.subscribers, LogEvent::Result(data));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        let mut state = self.state.lock();
        Self::broadcast(&mut state.subscribers, LogEvent::Error(message.into()));
    }

    /// Replay the combined buffer, then register `tx` for future events.
    /// Held under the same lock acquisition so no append can land between
    /// the replay and the registration (spec.md §4.1 `subscribe`).
    pub fn subscribe(&self, tx: mpsc::Sender<LogEvent>) -> String {
        let mut state = self.state.lock();
        let replay = state.buffer.combined().to_string();
        state.subscribers.push(tx);
        replay
    }

    /// A point-in-time copy of all three buffers (spec.md §4.2 `output`).
    pub fn output(&self) -> (String, String, String) {
        let state = self.state.lock();
        (
            state.buffer.stdout().to_string(),
            state.buffer.stderr().to_string(),
            state.buffer.combined().to_string(),
        )
    }

    pub fn combined_len(&self) -> usize {
        self.state.lock().buffer.combined_len()
    }

    /// Best-effort delivery: a subscriber whose channel is full or closed
    /// is dropped silently (spec.md §4.1 "fan-out... is best-effort").
    fn broadcast(subscribers: &mut Vec<mpsc::Sender<LogEvent>>, event: LogEvent) {
        subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
    }
}

#[cfg(test)]
#[path = "log_fanout_tests.rs"]
mod tests;
