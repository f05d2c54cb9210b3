// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fs` subcommand: read/write/delete/tree/find over the sandbox filesystem
//! (spec.md §4.4, §6).

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::io::Write as _;

#[derive(Args)]
pub struct FsArgs {
    #[command(subcommand)]
    pub command: FsCommand,
}

#[derive(Subcommand)]
pub enum FsCommand {
    /// Read a file's content
    Read {
        path: String,
        /// Write raw bytes to stdout instead of decoding as text
        #[arg(long)]
        raw: bool,
    },
    /// Write a file's content, creating parent directories as needed
    Write { path: String, content: String },
    /// Delete a file or directory
    Delete {
        path: String,
        /// Delete a directory and everything under it
        #[arg(long)]
        recursive: bool,
    },
    /// List a directory tree
    Tree { path: String },
    /// Find files matching a glob pattern under a path
    Find {
        path: String,
        /// Glob pattern, e.g. "**/*.rs"
        pattern: String,
    },
}

pub async fn handle(client: &DaemonClient, command: FsCommand, format: OutputFormat) -> Result<()> {
    match command {
        FsCommand::Read { path, raw } => read(client, &path, raw, format).await,
        FsCommand::Write { path, content } => {
            let result = client.fs_write(&path, &content).await.context("writing file")?;
            print_json_or(&result, format, || println!("wrote {path}"))
        }
        FsCommand::Delete { path, recursive } => {
            client.fs_delete(&path, recursive).await.context("deleting path")?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "deleted": path }));
            } else {
                println!("deleted {path}");
            }
            Ok(())
        }
        FsCommand::Tree { path } => {
            let tree = client.fs_tree(&path).await.context("listing tree")?;
            print_json_or(&tree, format, || print_tree(&tree, 0))
        }
        FsCommand::Find { path, pattern } => {
            let query = format!("pattern={}", urlencode(&pattern));
            let matches = client.fs_find(&path, &query).await.context("finding files")?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&matches)?),
                OutputFormat::Text => {
                    for m in &matches {
                        println!("{m}");
                    }
                }
            }
            Ok(())
        }
    }
}

async fn read(client: &DaemonClient, path: &str, raw: bool, format: OutputFormat) -> Result<()> {
    if raw {
        let bytes = client.fs_read_bytes(path).await.context("reading file")?;
        std::io::stdout().write_all(&bytes)?;
        return Ok(());
    }
    let result = client.fs_read(path).await.context("reading file")?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            if let Some(content) = result.get("content").and_then(|v| v.as_str()) {
                print!("{content}");
            }
        }
    }
    Ok(())
}

fn print_json_or(value: &serde_json::Value, format: OutputFormat, text: impl FnOnce()) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_tree(value: &serde_json::Value, depth: usize) {
    let indent = "  ".repeat(depth);
    let name = value.get("name").and_then(|v| v.as_str()).unwrap_or("?");
    let is_dir = value.get("isDir").and_then(|v| v.as_bool()).unwrap_or(false);
    if is_dir {
        println!("{indent}{name}/");
    } else {
        println!("{indent}{name}");
    }
    if let Some(children) = value.get("children").and_then(|v| v.as_array()) {
        for child in children {
            print_tree(child, depth + 1);
        }
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
