// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem Core (spec.md §4.4): path policy, read/write/delete, find,
//! and the recursive tree listing. The hard logic lives in the watcher
//! (`fs_watcher`); this module is comparatively mechanical.

use chrono::{DateTime, SecondsFormat, Utc};
use sandbox_core::FsError;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Filesystem operations scoped to one root directory. Every path argument
/// is the URL path tail after the mount prefix; `resolve` is the only
/// place `..` escapes and missing leading slashes are rejected.
pub struct FilesystemCore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileMeta {
    pub path: String,
    pub content: String,
    pub permissions: String,
    pub size: u64,
    pub last_modified: String,
    pub owner: String,
    pub group: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindType {
    File,
    Directory,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryTree {
    pub path: String,
    pub files: Vec<String>,
    pub subdirectories: Vec<DirectoryTree>,
}

const DEFAULT_EXCLUDE_DIRS: &[&str] = &["node_modules", ".git"];

/// Hard ceiling on entries walked by a single `find`/`tree` call, on top of
/// whatever `maxResults` the caller asks for. Bounds a hostile or merely huge
/// directory tree's walk time; this is a resource bound, not part of the
/// documented `maxResults` contract, so it's never reported back to callers.
const MAX_WALK_ENTRIES: usize = 50_000;

impl FilesystemCore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a request path tail to an on-disk path under `root`,
    /// rejecting anything that would escape it (spec.md §4.4 path policy).
    pub fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        if !path.starts_with('/') {
            return Err(FsError::InvalidPath(path.to_string()));
        }
        let mut resolved = self.root.clone();
        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(segment) => resolved.push(segment),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(FsError::InvalidPath(path.to_string()));
                }
            }
        }
        Ok(resolved)
    }

    /// Read a file and return it alongside metadata (spec.md §4.4 Read,
    /// JSON-object branch).
    pub fn read(&self, path: &str) -> Result<FileMeta, FsError> {
        let resolved = self.resolve(path)?;
        let content = std::fs::read_to_string(&resolved).map_err(not_found_or_io(path))?;
        let metadata = std::fs::metadata(&resolved).map_err(not_found_or_io(path))?;
        Ok(FileMeta {
            path: path.to_string(),
            content,
            permissions: mode_string(&metadata),
            size: metadata.len(),
            last_modified: last_modified_iso8601(&metadata),
            owner: owner_name(&metadata),
            group: group_name(&metadata),
        })
    }

    /// Read raw bytes plus a guessed mime type, for the `?download=true` /
    /// `Accept: application/octet-stream` branch.
    pub fn read_bytes(&self, path: &str) -> Result<(Vec<u8>, String), FsError> {
        let resolved = self.resolve(path)?;
        let bytes = std::fs::read(&resolved).map_err(not_found_or_io(path))?;
        let mime = mime_guess::from_path(&resolved)
            .first_or_octet_stream()
            .to_string();
        Ok((bytes, mime))
    }

    /// Write bytes, creating parent directories as needed. Both the JSON
    /// `content` body and multipart upload paths are expected to converge
    /// on a call to this (spec.md §4.4 Write).
    pub fn write(&self, path: &str, bytes: &[u8]) -> Result<(), FsError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&resolved, bytes)?;
        Ok(())
    }

    /// Delete a file, or a directory if `recursive` (spec.md §4.4 Delete).
    pub fn delete(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        let resolved = self.resolve(path)?;
        let metadata = std::fs::metadata(&resolved).map_err(not_found_or_io(path))?;
        if metadata.is_dir() {
            if !recursive && std::fs::read_dir(&resolved)?.next().is_some() {
                return Err(FsError::DirectoryNotEmpty(path.to_string()));
            }
            std::fs::remove_dir_all(&resolved)?;
        } else {
            std::fs::remove_file(&resolved)?;
        }
        Ok(())
    }

    /// Full recursive listing under `path` (spec.md §4.4 Tree endpoint).
    pub fn tree(&self, path: &str) -> Result<DirectoryTree, FsError> {
        let resolved = self.resolve(path)?;
        let mut remaining = MAX_WALK_ENTRIES;
        build_tree(&resolved, path, &mut remaining)
    }

    /// Breadth-first search under `path` for entries whose basename
    /// matches any of `patterns` (spec.md §4.4 Find).
    #[allow(clippy::too_many_arguments)]
    pub fn find(
        &self,
        path: &str,
        patterns: &[String],
        file_type: Option<FindType>,
        exclude_dirs: Option<&[String]>,
        exclude_hidden: bool,
        max_results: Option<usize>,
    ) -> Result<Vec<String>, FsError> {
        let resolved = self.resolve(path)?;
        let defaults: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect();
        let exclude_dirs = exclude_dirs.unwrap_or(&defaults);
        let effective_max = max_results.map_or(MAX_WALK_ENTRIES, |m| m.min(MAX_WALK_ENTRIES));

        let mut results = Vec::new();
        let mut walked = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(resolved.clone());

        'walk: while let Some(dir) = queue.pop_front() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                walked += 1;
                if walked > MAX_WALK_ENTRIES {
                    break 'walk;
                }
                let entry_path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                let is_hidden = name.starts_with('.');
                let is_dir = entry_path.is_dir();

                if is_dir && exclude_dirs.iter().any(|d| d == &name) {
                    continue;
                }
                if exclude_hidden && is_hidden {
                    continue;
                }

                if is_dir {
                    queue.push_back(entry_path.clone());
                }

                let type_matches = match file_type {
                    Some(FindType::File) => !is_dir,
                    Some(FindType::Directory) => is_dir,
                    None => true,
                };
                let name_matches =
                    patterns.is_empty() || patterns.iter().any(|p| glob_match(p, &name));

                if type_matches && name_matches {
                    results.push(entry_path.display().to_string());
                    if results.len() >= effective_max {
                        break 'walk;
                    }
                }
            }
        }
        Ok(results)
    }
}

fn build_tree(dir: &Path, display_path: &str, remaining: &mut usize) -> Result<DirectoryTree, FsError> {
    let mut tree = DirectoryTree {
        path: display_path.to_string(),
        files: Vec::new(),
        subdirectories: Vec::new(),
    };
    let entries = std::fs::read_dir(dir).map_err(not_found_or_io(display_path))?;
    for entry in entries.flatten() {
        if *remaining == 0 {
            break;
        }
        *remaining -= 1;
        let name = entry.file_name().to_string_lossy().into_owned();
        let entry_path = entry.path();
        if entry_path.is_dir() {
            let child_display = format!("{}/{name}", display_path.trim_end_matches('/'));
            tree.subdirectories
                .push(build_tree(&entry_path, &child_display, remaining)?);
        } else {
            tree.files.push(name);
        }
    }
    Ok(tree)
}

/// A minimal `*`/`?` glob matcher over a single path component. Full shell
/// glob semantics (character classes, `**`) are out of scope here; `find`'s
/// `patterns` only ever apply to a basename.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn matches(pattern: &[u8], text: &[u8]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                matches(&pattern[1..], text) || (!text.is_empty() && matches(pattern, &text[1..]))
            }
            (Some(b'?'), Some(_)) => matches(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if p == t => matches(&pattern[1..], &text[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), text.as_bytes())
}

fn not_found_or_io(path: &str) -> impl Fn(std::io::Error) -> FsError + '_ {
    move |e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FsError::NotFound(path.to_string())
        } else {
            FsError::Io(e)
        }
    }
}

#[cfg(unix)]
fn mode_string(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:o}", metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn mode_string(_metadata: &std::fs::Metadata) -> String {
    "644".to_string()
}

#[cfg(unix)]
fn owner_name(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    let uid = metadata.uid();
    nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| uid.to_string())
}

#[cfg(not(unix))]
fn owner_name(_metadata: &std::fs::Metadata) -> String {
    "unknown".to_string()
}

#[cfg(unix)]
fn group_name(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    let gid = metadata.gid();
    nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid))
        .ok()
        .flatten()
        .map(|g| g.name)
        .unwrap_or_else(|| gid.to_string())
}

#[cfg(not(unix))]
fn group_name(_metadata: &std::fs::Metadata) -> String {
    "unknown".to_string()
}

fn last_modified_iso8601(metadata: &std::fs::Metadata) -> String {
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now));
    modified.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "fs_core_tests.rs"]
mod tests;
