// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! sandbox-adapters: OS-facing edges of the sandbox agent.
//!
//! Everything here talks to the outside world: spawning children,
//! signaling process groups, polling `/proc/net/tcp`, and watching
//! directory trees. `sandbox-engine` depends on these types rather than
//! on `tokio::process` or `notify` directly.

mod env;
pub mod fs_watch;
pub mod port_event;
pub mod process;

pub use env::{adoption_poll_ms, port_poll_ms, restart_backoff_ms};
pub use fs_watch::{FsWatchAdapter, NotifyFsWatchAdapter, RawWatchEvent, RawWatchKind};
pub use port_event::{NoOpPortAdapter, PortEventAdapter, ProcNetTcpAdapter};
pub use process::{needs_shell, signal_group, spawn_child, tokenize_command, SpawnSpec};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fs_watch::FakeFsWatchAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use port_event::FakePortEventAdapter;
