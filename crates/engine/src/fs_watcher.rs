// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem Watcher subscription glue (spec.md §4.5): turns one
//! [`sandbox_adapters::FsWatchAdapter`] watch into a stream of
//! [`WatchFrame`]s. Ignore-token filtering and the create-then-rescan race
//! closer live in the adapter itself, since they need direct access to the
//! OS watch registrations; this layer only adapts the raw event shape to
//! the wire frame and owns the subscription's lifetime.

use crate::frame::WatchFrame;
use sandbox_adapters::fs_watch::FsWatchAdapter;
use sandbox_core::WatchError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct WatchService<W: FsWatchAdapter> {
    adapter: Arc<W>,
}

impl<W: FsWatchAdapter> WatchService<W> {
    pub fn new(adapter: Arc<W>) -> Self {
        Self { adapter }
    }

    /// Start one subscription. Dropping the returned receiver tears down
    /// the underlying OS watch (spec.md §4.5 "single-consumer per
    /// subscription... the watcher releases all registrations").
    pub fn subscribe(
        &self,
        root: PathBuf,
        recursive: bool,
        ignore: Vec<String>,
    ) -> Result<mpsc::Receiver<WatchFrame>, WatchError> {
        let mut raw_rx = self.adapter.watch(root, recursive, ignore)?;
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            while let Some(raw) = raw_rx.recv().await {
                let name = raw
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let frame = WatchFrame {
                    op: raw.kind.into(),
                    name,
                    path: raw.path.display().to_string(),
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
#[path = "fs_watcher_tests.rs"]
mod tests;
