// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `watch` subcommand: stream filesystem-change events (spec.md §4.5, §6).

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Args)]
pub struct WatchArgs {
    /// Path to watch, scoped by a glob (e.g. "/app/**/*.rs")
    pub path: String,
    /// Comma-separated glob patterns to ignore (e.g. "**/target/**,**/.git/**")
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,
}

pub async fn handle(client: &DaemonClient, args: WatchArgs, format: OutputFormat) -> Result<()> {
    let mut path = format!("/watch/filesystem{}", args.path);
    if !args.ignore.is_empty() {
        let joined: Vec<String> = args.ignore.iter().map(|p| urlencode(p)).collect();
        path.push_str("?ignore=");
        path.push_str(&joined.join(","));
    }

    client
        .stream_ndjson(&path, |line| print_event(line, format))
        .await
        .context("watching filesystem")?;
    Ok(())
}

fn print_event(line: &str, format: OutputFormat) {
    if format == OutputFormat::Json {
        println!("{line}");
        return;
    }
    let Ok(event) = serde_json::from_str::<serde_json::Value>(line) else {
        println!("{line}");
        return;
    };
    let kind = event.get("type").and_then(|v| v.as_str()).unwrap_or("?");
    let path = event.get("path").and_then(|v| v.as_str()).unwrap_or("");
    println!("{:<8} {path}", kind.to_uppercase());
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
