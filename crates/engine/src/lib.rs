// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sandbox-engine: the three core subsystems, free of network I/O.
//!
//! `sandbox-daemon` binds these operations to HTTP/WebSocket routes;
//! nothing in this crate knows an HTTP status code exists.

pub mod fs_core;
pub mod fs_watcher;
pub mod frame;
pub mod log_fanout;
pub mod supervisor;

pub use fs_core::{DirectoryTree, FileMeta, FilesystemCore, FindType};
pub use fs_watcher::WatchService;
pub use frame::{Frame, WatchFrame, WatchOp};
pub use log_fanout::{LogEvent, LogFanout};
pub use supervisor::ProcessSupervisor;
