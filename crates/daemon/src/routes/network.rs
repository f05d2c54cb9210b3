// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/network/process/{pid}/*` (spec.md §6). Network port enumeration is
//! explicitly out of core scope (spec.md §1): this just exposes whatever the
//! Port-Event Source observes, with no webhook delivery to a `callback`.

use crate::state::{AppState, PortMonitor};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sandbox_adapters::port_event::PortEventAdapter;
use sandbox_core::{PortInfo, PortState};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// `GET /network/process/{pid}/ports`. Returns whatever the most recent
/// `/monitor` subscription (if any) has observed so far; an unmonitored pid
/// reports an empty list rather than an error, since polling is optional.
pub async fn ports(State(state): State<AppState>, Path(pid): Path<u32>) -> Json<Vec<PortInfo>> {
    let monitors = state.port_monitors.lock();
    let ports = monitors
        .get(&pid)
        .map(|m| m.ports.lock().clone())
        .unwrap_or_default();
    Json(ports)
}

#[derive(Debug, Deserialize)]
pub struct MonitorRequest {
    #[serde(default)]
    pub callback: Option<String>,
}

/// `POST /network/process/{pid}/monitor`. Starts (or restarts) a background
/// task draining the Port-Event Source for `pid` into a tracked snapshot.
pub async fn monitor_start(
    State(state): State<AppState>,
    Path(pid): Path<u32>,
    Json(_request): Json<MonitorRequest>,
) -> Response {
    let ports = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let (tx, mut rx) = mpsc::channel::<PortInfo>(64);
    state.port_adapter.watch(pid, tx);

    let tracked = ports.clone();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let mut ports = tracked.lock();
            ports.retain(|p: &PortInfo| p.local_port != event.local_port);
            if event.state == PortState::Open {
                ports.push(event);
            }
        }
    });

    if let Some(old) = state
        .port_monitors
        .lock()
        .insert(pid, PortMonitor { handle, ports })
    {
        old.handle.abort();
    }

    StatusCode::OK.into_response()
}

/// `DELETE /network/process/{pid}/monitor`.
pub async fn monitor_stop(State(state): State<AppState>, Path(pid): Path<u32>) -> StatusCode {
    if let Some(monitor) = state.port_monitors.lock().remove(&pid) {
        monitor.handle.abort();
    }
    StatusCode::OK
}
