// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/upgrade` (spec.md §4.3, §5). Single-flight: a second request arriving
//! while an attempt is already running sees *busy* rather than queuing.

use crate::checkpoint::build_snapshot;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sandbox_core::{UpgradeStatus, UpgradeStep};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub version: String,
    pub base_url: String,
}

pub async fn status(State(state): State<AppState>) -> Json<UpgradeStatus> {
    Json(state.upgrade_status.lock().clone())
}

/// Kicks off the pipeline in a background task and returns immediately
/// (spec.md §6: "initiates hot upgrade; returns immediately; status
/// observable at `GET /upgrade/status`").
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<UpgradeRequest>,
) -> Response {
    let Ok(guard) = state.upgrade_lock.clone().try_lock_owned() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "an upgrade attempt is already running" })),
        )
            .into_response();
    };

    tokio::spawn(run_upgrade(state, request, guard));
    StatusCode::ACCEPTED.into_response()
}

async fn run_upgrade(
    state: AppState,
    request: UpgradeRequest,
    _guard: tokio::sync::OwnedMutexGuard<()>,
) {
    let exe_path = std::env::current_exe().unwrap_or_default();
    if sandbox_storage::upgrade::is_dev_mode(&exe_path, state.config.dev_mode_marker.as_deref()) {
        let mut status = state.upgrade_status.lock();
        status.status = "skipped".into();
        status.step = UpgradeStep::DevModeSkipped;
        status.version = Some(request.version);
        status.last_attempt = Some(chrono::Utc::now());
        return;
    }

    let staging_dir = std::env::temp_dir();
    let staging_path = sandbox_storage::upgrade::staging_path(&staging_dir, &request.version);
    let download_url = format!(
        "{}/{}",
        request.base_url.trim_end_matches('/'),
        request.version
    );

    set_status(&state, UpgradeStep::Downloading, |s| {
        s.version = Some(request.version.clone());
        s.download_url = Some(download_url.clone());
    });

    let bytes = match sandbox_storage::upgrade::download(&download_url, &staging_path).await {
        Ok(bytes) => bytes,
        Err(e) => return fail(&state, e.to_string()),
    };
    set_status(&state, UpgradeStep::Validating, |s| s.bytes_downloaded = bytes);

    let snapshot = build_snapshot(&state);
    let (expected_total, expected_running) = (snapshot.processes.len(), snapshot.running_count());
    if let Err(e) = sandbox_storage::snapshot::save(&state.config.state_file, &snapshot) {
        return fail(&state, e.to_string());
    }

    if let Err(e) = sandbox_storage::upgrade::validate(
        &staging_path,
        state.config.validation_port,
        &state.config.state_file,
        expected_total,
        expected_running,
    )
    .await
    {
        let _ = tokio::fs::remove_file(&staging_path).await;
        return fail(&state, e.to_string());
    }

    set_status(&state, UpgradeStep::Replacing, |s| {
        s.binary_path = Some(exe_path.display().to_string());
    });

    let argv: Vec<String> = std::env::args().collect();
    if let Err(e) = sandbox_storage::upgrade::replace(
        &staging_path,
        &exe_path,
        &argv,
        state.config.upgrade_count + 1,
    ) {
        fail(&state, e.to_string());
    }
    // `replace` only returns on failure; success never reaches here.
}

fn set_status(state: &AppState, step: UpgradeStep, mutate: impl FnOnce(&mut UpgradeStatus)) {
    let mut status = state.upgrade_status.lock();
    status.step = step;
    status.status = format!("{step:?}").to_lowercase();
    status.last_attempt = Some(chrono::Utc::now());
    mutate(&mut status);
}

fn fail(state: &AppState, error: String) {
    let mut status = state.upgrade_status.lock();
    status.step = UpgradeStep::Failed;
    status.status = "failed".into();
    status.error = Some(error);
    status.last_attempt = Some(chrono::Utc::now());
}
