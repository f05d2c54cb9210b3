// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk persistence for the [`ManagerSnapshot`] (spec.md §4.3).
//!
//! Written via `write(path.tmp)` then `rename(path.tmp, path)` so a crash
//! mid-write never leaves a half-written snapshot in the spot the next
//! boot's loader reads from.

use chrono::Utc;
use sandbox_core::ManagerSnapshot;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Save atomically: write to `path` with a `.tmp` extension, `fsync`, then
/// rename over the real path.
pub fn save(path: &Path, snapshot: &ManagerSnapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, snapshot)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load the snapshot at `path`, or `Ok(None)` if it doesn't exist yet (first
/// boot). A corrupt file is rotated to `.bak` and treated as absent so the
/// daemon still starts — the loader falls back to nothing to adopt.
pub fn load(path: &Path) -> Result<Option<ManagerSnapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader::<_, ManagerSnapshot>(reader) {
        Ok(snapshot) => {
            let age = Utc::now().signed_duration_since(snapshot.saved_at);
            info!(age_secs = age.num_seconds(), path = %path.display(), "loaded snapshot");
            Ok(Some(snapshot))
        }
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "corrupt snapshot, moving aside and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(None)
        }
    }
}

const MAX_BAK_FILES: u32 = 3;

fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
