// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Port-event source poll interval (default: 500ms). The `/proc/net/tcp`
/// adapter has no push notification, so it polls at this cadence.
pub fn port_poll_ms() -> Duration {
    parse_duration_ms("SANDBOX_PORT_POLL_MS").unwrap_or(Duration::from_millis(500))
}

/// Adopted-process liveness poll interval (default: 1000ms, spec.md §4.3
/// "monitor fiber that polls the OS pid once per second").
pub fn adoption_poll_ms() -> Duration {
    parse_duration_ms("SANDBOX_ADOPTION_POLL_MS").unwrap_or(Duration::from_secs(1))
}

/// Delay between a failed attempt and a restart (spec.md §4.2 step 4: "wait 10 ms").
pub fn restart_backoff_ms() -> Duration {
    parse_duration_ms("SANDBOX_RESTART_BACKOFF_MS").unwrap_or(Duration::from_millis(10))
}
