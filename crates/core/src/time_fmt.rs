// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared human-readable duration formatting and epoch-millis helpers.
//! Calendar timestamps (`savedAt`, `lastAttempt`, file `lastModified`) are
//! `chrono::DateTime<Utc>` at the type level; this module only covers the
//! per-log-line elapsed-time formatting that runs on the hot path.

use std::time::{SystemTime, UNIX_EPOCH};

/// Format seconds as a short human-readable duration: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{}h{}m", h, m)
        } else {
            format!("{}h", h)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Format milliseconds as a short human-readable duration.
pub fn format_elapsed_ms(ms: u64) -> String {
    format_elapsed(ms / 1000)
}

/// Current time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
