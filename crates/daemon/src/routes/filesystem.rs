// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/filesystem/*` (spec.md §6, §4.4). Every handler here receives the
//! wildcard tail axum captured (no leading slash) and re-adds the leading
//! `/` [`FilesystemCore::resolve`] requires.

use crate::routes::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use sandbox_engine::fs_core::FindType;
use serde::Deserialize;
use serde_json::json;

fn with_leading_slash(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadQuery {
    #[serde(default)]
    pub download: bool,
}

fn wants_raw_bytes(headers: &HeaderMap, query: &ReadQuery) -> bool {
    query.download
        || headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/octet-stream"))
}

/// `GET /filesystem/{path}` (spec.md §4.4 Read).
pub async fn read(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
    Query(query): Query<ReadQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = with_leading_slash(&raw_path);

    if wants_raw_bytes(&headers, &query) {
        let (bytes, mime) = state.fs.read_bytes(&path)?;
        let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            bytes,
        )
            .into_response());
    }

    let meta = state.fs.read(&path)?;
    Ok(Json(meta).into_response())
}

#[derive(Debug, Deserialize)]
pub struct WriteBody {
    pub content: String,
}

/// `PUT /filesystem/{path}` (spec.md §4.4 Write). Multipart upload is out of
/// scope for this crate's surface (SPEC_FULL.md §13 Non-Goals); only the
/// JSON-body `content` path is implemented.
pub async fn write(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
    Json(body): Json<WriteBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let path = with_leading_slash(&raw_path);
    state.fs.write(&path, body.content.as_bytes())?;
    Ok(Json(json!({ "path": path })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    #[serde(default)]
    pub recursive: bool,
}

/// `DELETE /filesystem/{path}?recursive=bool` (spec.md §4.4 Delete).
pub async fn delete(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, ApiError> {
    let path = with_leading_slash(&raw_path);
    state.fs.delete(&path, query.recursive)?;
    Ok(StatusCode::OK)
}

/// `GET /filesystem/tree/{path}` (spec.md §4.4 Tree endpoint).
pub async fn tree(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
) -> Result<Response, ApiError> {
    let path = with_leading_slash(&raw_path);
    Ok(Json(state.fs.tree(&path)?).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindQuery {
    #[serde(default)]
    pub patterns: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    #[serde(default)]
    pub exclude_dirs: Option<String>,
    #[serde(default)]
    pub exclude_hidden: Option<bool>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// `GET /filesystem/find/{path}?patterns=&type=&excludeDirs=&excludeHidden=&maxResults=`
/// (spec.md §4.4 Find).
pub async fn find(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
    Query(query): Query<FindQuery>,
) -> Result<Response, ApiError> {
    let path = with_leading_slash(&raw_path);
    let patterns: Vec<String> = query
        .patterns
        .as_deref()
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    let file_type = match query.file_type.as_deref() {
        Some("file") => Some(FindType::File),
        Some("directory") => Some(FindType::Directory),
        _ => None,
    };
    let exclude_dirs: Option<Vec<String>> = query
        .exclude_dirs
        .as_deref()
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect());
    let results = state.fs.find(
        &path,
        &patterns,
        file_type,
        exclude_dirs.as_deref(),
        query.exclude_hidden.unwrap_or(true),
        query.max_results,
    )?;
    Ok(Json(results).into_response())
}
