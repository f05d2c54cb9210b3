// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/process` and its log-streaming children (spec.md §6).

use crate::routes::ApiError;
use crate::state::{AppState, Supervisor};
use axum::body::{Body, Bytes};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use futures_util::{SinkExt, StreamExt};
use sandbox_core::{ProcessError, ProcessRecord, SpawnRequest};
use sandbox_engine::frame::Frame;
use sandbox_engine::log_fanout::LogEvent;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub async fn list(State(state): State<AppState>) -> Json<Vec<ProcessRecord>> {
    Json(state.supervisor.list())
}

/// `POST /process` (spec.md §6). `wait_for_completion` or a non-empty
/// `wait_for_ports` routes through `executeSync`; an `Accept:
/// text/event-stream` request instead gets the NDJSON frame stream started
/// by [`spawn_frame_forwarder`].
pub async fn spawn(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SpawnRequest>,
) -> Result<Response, ApiError> {
    if wants_event_stream(&headers) {
        let record = state.supervisor.spawn(request).await?;
        state.supervisor.reap_terminal(state.config.max_records);
        return Ok(ndjson_response(
            state.supervisor.clone(),
            record.id,
            record.name,
            record.pid,
        )?);
    }

    let record = if request.wait_for_completion || !request.wait_for_ports.is_empty() {
        let timeout = request.timeout;
        state.supervisor.execute_sync(request, timeout).await?
    } else {
        state.supervisor.spawn(request).await?
    };
    state.supervisor.reap_terminal(state.config.max_records);
    Ok(Json(record).into_response())
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessRecord>, ApiError> {
    let record = state
        .supervisor
        .get(&id)
        .ok_or_else(|| ProcessError::NotFound(id))?;
    Ok(Json(record))
}

pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessRecord>, ApiError> {
    state.supervisor.stop(&id)?;
    Ok(Json(state.supervisor.get(&id).ok_or(ProcessError::NotFound(id))?))
}

pub async fn kill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessRecord>, ApiError> {
    state.supervisor.kill(&id)?;
    Ok(Json(state.supervisor.get(&id).ok_or(ProcessError::NotFound(id))?))
}

pub async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (stdout, stderr, logs) = state.supervisor.output(&id)?;
    Ok(Json(json!({ "stdout": stdout, "stderr": stderr, "logs": logs })))
}

pub async fn logs_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .supervisor
        .get(&id)
        .ok_or_else(|| ProcessError::NotFound(id.clone()))?;
    ndjson_response(state.supervisor.clone(), id, record.name, record.pid)
}

pub async fn logs_stream_ws(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let record = state
        .supervisor
        .get(&id)
        .ok_or_else(|| ProcessError::NotFound(id.clone()))?;
    let frame_rx = spawn_frame_forwarder(state.supervisor.clone(), id, record.name, record.pid)?;
    Ok(ws.on_upgrade(move |socket| handle_log_ws(socket, frame_rx)).into_response())
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"))
}

fn ndjson_response(
    supervisor: Arc<Supervisor>,
    id: String,
    name: Option<String>,
    pid: u32,
) -> Result<Response, ApiError> {
    let frame_rx = spawn_frame_forwarder(supervisor, id, name, pid)?;
    let body = Body::from_stream(
        ReceiverStream::new(frame_rx).map(|frame| Ok::<_, Infallible>(Bytes::from(frame.to_ndjson_line()))),
    );
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
        .into_response())
}

async fn handle_log_ws(socket: WebSocket, frame_rx: mpsc::Receiver<Frame>) {
    let (mut sender, mut receiver) = socket.split();
    tokio::spawn(async move { while receiver.next().await.is_some() {} });

    let mut frames = ReceiverStream::new(frame_rx);
    while let Some(frame) = frames.next().await {
        let text = serde_json::to_string(&frame).unwrap_or_default();
        if sender.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}

/// Subscribes to `id`'s log fan-out and translates every [`LogEvent`] into a
/// [`Frame`], detecting the terminal [`LogEvent::Status`] to synthesize the
/// closing `result` frame (spec.md §4.1 frame format) without adding a
/// `wait_terminal`-style method to the supervisor itself.
fn spawn_frame_forwarder(
    supervisor: Arc<Supervisor>,
    id: String,
    name: Option<String>,
    pid: u32,
) -> Result<mpsc::Receiver<Frame>, ApiError> {
    let (tx, mut rx) = mpsc::channel::<LogEvent>(256);
    let replay = supervisor.stream(&id, tx)?;
    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(256);

    tokio::spawn(async move {
        if !replay.is_empty() {
            let frame = Frame::Stdout {
                log: replay,
                name: name.clone(),
                pid,
            };
            if frame_tx.send(frame).await.is_err() {
                return;
            }
        }

        while let Some(event) = rx.recv().await {
            let terminal = matches!(&event, LogEvent::Status { status, .. } if status != "running");
            if let Some(frame) = Frame::from_log_event(&event, name.as_deref(), pid) {
                if frame_tx.send(frame).await.is_err() {
                    return;
                }
            }
            if terminal {
                if let Some(final_record) = supervisor.get(&id) {
                    if let Ok(data) = serde_json::to_value(&final_record) {
                        let _ = frame_tx.send(Frame::Result { data }).await;
                    }
                }
                return;
            }
        }
    });

    Ok(frame_rx)
}
