// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /health` (spec.md §6). Deliberately touches nothing but its own
//! stack frame — SPEC_FULL.md §12 requires this to stay reachable even if
//! the registry lock is stuck, since the upgrade validator's liveness
//! check depends on it.

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
