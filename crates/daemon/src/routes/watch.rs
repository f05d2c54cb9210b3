// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/watch/filesystem/*` (spec.md §6, §4.5).

use crate::routes::ApiError;
use crate::state::AppState;
use axum::body::{Body, Bytes};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use sandbox_engine::frame::WatchFrame;
use serde::Deserialize;
use std::convert::Infallible;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    #[serde(default)]
    pub ignore: Option<String>,
}

fn ignore_tokens(query: &WatchQuery) -> Vec<String> {
    query
        .ignore
        .as_deref()
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

/// A trailing `/**` on the captured path tail enables recursion (spec.md
/// §4.5, §6); strip it before resolving the real filesystem path.
fn split_recursive(raw_path: &str) -> (&str, bool) {
    match raw_path.strip_suffix("/**") {
        Some(base) => (base, true),
        None => (raw_path, false),
    }
}

fn resolve_root(
    state: &AppState,
    raw_path: &str,
) -> Result<(PathBuf, String, bool), ApiError> {
    let (base, recursive) = split_recursive(raw_path);
    let base_path = if base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{base}")
    };
    let root = state.fs.resolve(&base_path)?;
    Ok((root, base_path, recursive))
}

/// `GET /watch/filesystem/{path}` (NDJSON).
pub async fn watch_ndjson(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
    Query(query): Query<WatchQuery>,
) -> Result<Response, ApiError> {
    let (root, base_path, recursive) = resolve_root(&state, &raw_path)?;
    let mut frame_rx = state.watch.subscribe(root, recursive, ignore_tokens(&query))?;

    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(256);
    tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let line = if recursive {
                frame.to_ndjson_line()
            } else {
                frame.to_plain_line(&base_path)
            };
            if tx.send(Ok(Bytes::from(line))).await.is_err() {
                return;
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
        .into_response())
}

/// `GET /ws/watch/filesystem/{path}` (WebSocket, identical events).
pub async fn watch_ws(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
    Query(query): Query<WatchQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let (root, _base_path, recursive) = resolve_root(&state, &raw_path)?;
    let frame_rx = state.watch.subscribe(root, recursive, ignore_tokens(&query))?;
    Ok(ws.on_upgrade(move |socket| handle_watch_ws(socket, frame_rx)).into_response())
}

async fn handle_watch_ws(socket: WebSocket, frame_rx: mpsc::Receiver<WatchFrame>) {
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
