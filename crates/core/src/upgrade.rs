// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory status of the last (or current) hot-upgrade attempt (spec.md
//! §4.3). `sandbox-storage` owns the state machine that mutates this; this
//! crate only defines the shape so the daemon can serialize it unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Step reached by the upgrade pipeline (spec.md §4.3 steps 1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStep {
    Idle,
    DevModeSkipped,
    Downloading,
    Validating,
    Replacing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeStatus {
    pub status: String,
    pub step: UpgradeStep,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub binary_path: Option<String>,
    #[serde(default)]
    pub bytes_downloaded: u64,
}

impl Default for UpgradeStatus {
    fn default() -> Self {
        Self {
            status: "idle".into(),
            step: UpgradeStep::Idle,
            version: None,
            last_attempt: None,
            error: None,
            download_url: None,
            binary_path: None,
            bytes_downloaded: 0,
        }
    }
}
