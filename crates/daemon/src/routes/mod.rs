// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod filesystem;
pub mod health;
pub mod network;
pub mod process;
pub mod upgrade;
pub mod watch;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sandbox_core::{FsError, ProcessError, WatchError};
use serde_json::json;

/// Maps every crate-local error enum onto the taxonomy in spec.md §7. This
/// is the one place in the workspace that turns a domain error into an HTTP
/// status code — `sandbox-engine`/`sandbox-core` never see a status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        let status = match &err {
            ProcessError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProcessError::Conflict(_) => StatusCode::CONFLICT,
            ProcessError::WorkingDirMissing(_) | ProcessError::Timeout(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ProcessError::NotFound(_) => StatusCode::NOT_FOUND,
            ProcessError::SpawnFailed(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<FsError> for ApiError {
    fn from(err: FsError) -> Self {
        let status = match &err {
            FsError::InvalidPath(_) | FsError::NotFound(_) => StatusCode::NOT_FOUND,
            FsError::DirectoryNotEmpty(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<WatchError> for ApiError {
    fn from(err: WatchError) -> Self {
        let status = match &err {
            WatchError::InvalidPath(_) => StatusCode::NOT_FOUND,
            WatchError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}
