// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI, mirroring the
//! daemon's own `env.rs` convention of one function per variable.

/// Base URL of the daemon this CLI talks to (default:
/// `http://127.0.0.1:8080`). Overridable per-invocation with `--url`.
pub fn daemon_url() -> String {
    std::env::var("SANDBOXCTL_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}

/// Timeout for a single HTTP request (not used for long-lived streams).
pub fn request_timeout_ms() -> u64 {
    std::env::var("SANDBOXCTL_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000)
}
