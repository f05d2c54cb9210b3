// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem Watcher backend (spec.md §4.5).
//!
//! One [`FsWatchAdapter::watch`] call corresponds to one subscription: it
//! owns its own `notify` watcher, registers the root (and, if recursive,
//! every existing descendant that passes the ignore filter), and then
//! closes the "npm install race" itself — on every `CREATE` of a directory
//! that passes the filter it registers a watch for that directory and
//! rescans it in the same loop iteration that drained the OS event, before
//! any event already queued for a file inside it can be delivered.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use sandbox_core::WatchError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Kind of change observed, collapsed from `notify::EventKind` to the
/// vocabulary the spec's `{op, name, path}` frame uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawWatchKind {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWatchEvent {
    pub kind: RawWatchKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// A source of filesystem change events, scoped to one subscription.
pub trait FsWatchAdapter: Send + Sync + 'static {
    /// Begin watching `root`. If `recursive`, descend into subdirectories
    /// (existing and future) that pass `ignore`. The returned receiver
    /// yields events until the caller drops it, at which point the
    /// underlying OS registrations are released.
    fn watch(
        &self,
        root: PathBuf,
        recursive: bool,
        ignore: Vec<String>,
    ) -> Result<mpsc::Receiver<RawWatchEvent>, WatchError>;
}

/// A path is ignored if any component from `root` down to itself
/// (inclusive) exactly matches one of `ignore`'s tokens (spec.md §4.5:
/// "not a glob"; "any path whose basename equals a token, or whose
/// ancestor's basename equals a token, is suppressed").
fn is_ignored(path: &Path, root: &Path, ignore: &[String]) -> bool {
    if ignore.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        ignore.iter().any(|token| token == name.as_ref())
    })
}

fn classify(kind: &EventKind) -> Option<RawWatchKind> {
    match kind {
        EventKind::Create(_) => Some(RawWatchKind::Create),
        EventKind::Remove(_) => Some(RawWatchKind::Remove),
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => Some(RawWatchKind::Rename),
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => Some(RawWatchKind::Chmod),
        EventKind::Modify(_) => Some(RawWatchKind::Write),
        _ => None,
    }
}

/// Window within which a repeated `(kind, path)` pair is treated as a
/// duplicate rather than a distinct event (spec.md §4.5 ordering note).
const DEDUP_WINDOW: Duration = Duration::from_millis(200);

fn existing_descendant_dirs(root: &Path, ignore: &[String]) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && !is_ignored(&path, root, ignore) {
                dirs.push(path.clone());
                stack.push(path);
            }
        }
    }
    dirs
}

#[derive(Default)]
pub struct NotifyFsWatchAdapter;

impl FsWatchAdapter for NotifyFsWatchAdapter {
    fn watch(
        &self,
        root: PathBuf,
        recursive: bool,
        ignore: Vec<String>,
    ) -> Result<mpsc::Receiver<RawWatchEvent>, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::InvalidPath(root.display().to_string()));
        }

        let (raw_tx, raw_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })
        .map_err(|e| WatchError::Backend(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Backend(e.to_string()))?;

        let mut registered: HashSet<PathBuf> = HashSet::new();
        registered.insert(root.clone());
        if recursive {
            for dir in existing_descendant_dirs(&root, &ignore) {
                if watcher.watch(&dir, RecursiveMode::NonRecursive).is_ok() {
                    registered.insert(dir);
                }
            }
        }

        let (tx, rx) = mpsc::channel(256);
        tokio::task::spawn_blocking(move || {
            // `watcher` lives in this closure; dropping it on return
            // unregisters every watch it holds.
            let mut seen: HashSet<PathBuf> = HashSet::new();
            let mut recent: Vec<(RawWatchKind, PathBuf, Instant)> = Vec::new();

            while let Ok(event) = raw_rx.recv() {
                let Ok(event) = event else { continue };
                let Some(kind) = classify(&event.kind) else {
                    continue;
                };
                for path in event.paths {
                    if is_ignored(&path, &root, &ignore) {
                        continue;
                    }
                    let now = Instant::now();
                    recent.retain(|(_, _, at)| now.duration_since(*at) < DEDUP_WINDOW);
                    if recent
                        .iter()
                        .any(|(k, p, _)| *k == kind && p == &path)
                    {
                        continue;
                    }
                    recent.push((kind, path.clone(), now));

                    let is_dir = path.is_dir();
                    seen.insert(path.clone());
                    if tx
                        .blocking_send(RawWatchEvent {
                            kind,
                            path: path.clone(),
                            is_dir,
                        })
                        .is_err()
                    {
                        return;
                    }

                    if recursive
                        && kind == RawWatchKind::Create
                        && is_dir
                        && !registered.contains(&path)
                    {
                        if watcher.watch(&path, RecursiveMode::NonRecursive).is_err() {
                            continue;
                        }
                        registered.insert(path.clone());

                        let Ok(entries) = std::fs::read_dir(&path) else {
                            continue;
                        };
                        for entry in entries.flatten() {
                            let entry_path = entry.path();
                            if is_ignored(&entry_path, &root, &ignore) || seen.contains(&entry_path)
                            {
                                continue;
                            }
                            seen.insert(entry_path.clone());
                            let entry_is_dir = entry_path.is_dir();
                            if tx
                                .blocking_send(RawWatchEvent {
                                    kind: RawWatchKind::Create,
                                    path: entry_path,
                                    is_dir: entry_is_dir,
                                })
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Test double: emits a fixed, pre-recorded sequence of events regardless
/// of the requested root.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeFsWatchAdapter {
    events: Vec<RawWatchEvent>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeFsWatchAdapter {
    pub fn new(events: Vec<RawWatchEvent>) -> Self {
        Self { events }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl FsWatchAdapter for FakeFsWatchAdapter {
    fn watch(
        &self,
        _root: PathBuf,
        _recursive: bool,
        _ignore: Vec<String>,
    ) -> Result<mpsc::Receiver<RawWatchEvent>, WatchError> {
        let (tx, rx) = mpsc::channel(self.events.len().max(1));
        let events = self.events.clone();
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
#[path = "fs_watch_tests.rs"]
mod tests;
