// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sandbox-core: shared domain types for the sandbox agent.
//!
//! Every type here is plain data plus pure (non-blocking, non-async) logic.
//! OS interaction lives in `sandbox-adapters`; orchestration lives in
//! `sandbox-engine`; on-disk persistence lives in `sandbox-storage`.

pub mod error;
pub mod id;
pub mod log_buffer;
pub mod port;
pub mod process;
pub mod snapshot;
pub mod time_fmt;
pub mod upgrade;

pub use error::{FsError, ProcessError, WatchError};
pub use id::{IdGen, ShortId, UuidIdGen};
pub use log_buffer::{LogBuffer, LogStream};
pub use port::{PortInfo, PortState};
pub use process::{
    validate_request, ProcessRecord, ProcessStatus, RestartPolicy, SpawnRequest, MAX_RESTARTS_CAP,
};
pub use id::ProcessId;
pub use snapshot::{ManagerSnapshot, ProcessState, SNAPSHOT_SCHEMA_VERSION};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
pub use upgrade::{UpgradeStatus, UpgradeStep};
