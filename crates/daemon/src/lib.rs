// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sandbox-daemon: the HTTP/WebSocket binding named in spec.md §6.
//!
//! Everything here is a thin adapter: handlers parse the request, call into
//! `sandbox-engine`/`sandbox-storage`, and serialize the result. No
//! supervision, persistence, or watch logic lives in this crate.

pub mod checkpoint;
pub mod env;
pub mod routes;
pub mod startup;
pub mod state;

use axum::routing::{delete, get, post};
use axum::Router;
use state::AppState;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Assemble the full router (SPEC_FULL.md §12: trace + CORS layers on top
/// of spec.md §6's endpoint surface). Split out from `main` so integration
/// tests can bind it to an ephemeral port without going through startup.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/process",
            get(routes::process::list).post(routes::process::spawn),
        )
        .route("/process/:id", get(routes::process::get_one))
        .route("/process/:id", delete(routes::process::stop))
        .route("/process/:id/kill", delete(routes::process::kill))
        .route("/process/:id/logs", get(routes::process::logs))
        .route(
            "/process/:id/logs/stream",
            get(routes::process::logs_stream),
        )
        .route(
            "/ws/process/:id/logs/stream",
            get(routes::process::logs_stream_ws),
        )
        .route(
            "/filesystem/tree/*path",
            get(routes::filesystem::tree),
        )
        .route(
            "/filesystem/find/*path",
            get(routes::filesystem::find),
        )
        .route(
            "/filesystem/*path",
            get(routes::filesystem::read)
                .put(routes::filesystem::write)
                .delete(routes::filesystem::delete),
        )
        .route(
            "/watch/filesystem/*path",
            get(routes::watch::watch_ndjson),
        )
        .route(
            "/ws/watch/filesystem/*path",
            get(routes::watch::watch_ws),
        )
        .route(
            "/network/process/:pid/ports",
            get(routes::network::ports),
        )
        .route(
            "/network/process/:pid/monitor",
            post(routes::network::monitor_start).delete(routes::network::monitor_stop),
        )
        .route("/upgrade", post(routes::upgrade::start))
        .route("/upgrade/status", get(routes::upgrade::status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bounded drain window for in-flight requests on graceful shutdown
/// (SPEC_FULL.md §12).
pub const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);
