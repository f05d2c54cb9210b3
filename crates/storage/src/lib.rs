// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sandbox-storage: snapshot persistence, the adoption loader, and the
//! hot-upgrade pipeline (spec.md §4.3).
//!
//! Nothing here owns a live [`sandbox_core::ProcessRecord`]'s reader fibers
//! or subscribers — those belong to `sandbox-engine`'s registry. This crate
//! only produces the data and decisions (`AdoptionOutcome`, a validated
//! successor binary) that `sandbox-daemon` wires into that registry at
//! startup and on `/upgrade`.

pub mod adoption;
pub mod snapshot;
pub mod upgrade;

pub use adoption::{probe, tail_read, wait_for_exit, AdoptionOutcome, ReapedExit};
pub use snapshot::SnapshotError;
pub use upgrade::UpgradeError;
