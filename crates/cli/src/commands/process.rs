// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `process` subcommand: spawn/list/get/stop/kill/logs (spec.md §6).

use crate::client::DaemonClient;
use crate::output::{format_time_ago, OutputFormat};
use crate::table::{Column, Table};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use sandbox_core::{ProcessRecord, SpawnRequest};
use std::collections::{BTreeSet, HashMap};

#[derive(Args)]
pub struct ProcessArgs {
    #[command(subcommand)]
    pub command: ProcessCommand,
}

#[derive(Subcommand)]
pub enum ProcessCommand {
    /// Spawn a new supervised process
    Spawn(SpawnArgs),
    /// List all processes
    List,
    /// Show one process
    Get { id: String },
    /// Gracefully stop a process
    Stop { id: String },
    /// Forcefully kill a process
    Kill { id: String },
    /// Show a process's buffered logs, optionally following new output
    Logs {
        id: String,
        /// Stream new log lines as they arrive (NDJSON)
        #[arg(long, short)]
        follow: bool,
    },
}

#[derive(Args)]
pub struct SpawnArgs {
    /// Shell command line to execute
    pub command: String,
    /// Friendly name, unique among running processes
    #[arg(long)]
    pub name: Option<String>,
    /// Working directory (must already exist)
    #[arg(long = "cwd")]
    pub working_dir: Option<String>,
    /// Environment variable, repeatable: --env KEY=VALUE
    #[arg(long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
    /// Restart automatically on non-zero exit
    #[arg(long)]
    pub restart_on_failure: bool,
    /// Cap on automatic restarts (0 uses the server-side default cap)
    #[arg(long, default_value_t = 0)]
    pub max_restarts: u32,
    /// Port to wait on before returning, repeatable
    #[arg(long = "wait-for-port")]
    pub wait_for_ports: Vec<u16>,
    /// Seconds to wait before giving up (0 = no timeout)
    #[arg(long, default_value_t = 0)]
    pub timeout: u64,
    /// Block until the process exits and return its final record
    #[arg(long)]
    pub wait: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

pub async fn handle(client: &DaemonClient, command: ProcessCommand, format: OutputFormat) -> Result<()> {
    match command {
        ProcessCommand::Spawn(args) => spawn(client, args, format).await,
        ProcessCommand::List => list(client, format).await,
        ProcessCommand::Get { id } => {
            let record = client.get(&id).await.context("fetching process")?;
            print_record(&record, format)
        }
        ProcessCommand::Stop { id } => {
            let record = client.stop(&id).await.context("stopping process")?;
            print_record(&record, format)
        }
        ProcessCommand::Kill { id } => {
            let record = client.kill(&id).await.context("killing process")?;
            print_record(&record, format)
        }
        ProcessCommand::Logs { id, follow } => logs(client, &id, follow, format).await,
    }
}

async fn spawn(client: &DaemonClient, args: SpawnArgs, format: OutputFormat) -> Result<()> {
    let request = SpawnRequest {
        command: args.command,
        name: args.name,
        working_dir: args.working_dir,
        env: args.env.into_iter().collect::<HashMap<_, _>>(),
        restart_on_failure: args.restart_on_failure,
        max_restarts: args.max_restarts,
        wait_for_ports: args.wait_for_ports.into_iter().collect::<BTreeSet<_>>(),
        timeout: args.timeout,
        wait_for_completion: args.wait,
    };
    let record = client.spawn(&request).await.context("spawning process")?;
    print_record(&record, format)
}

async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let records = client.list().await.context("listing processes")?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            let mut table = Table::new(vec![
                Column::left("ID"),
                Column::left("NAME"),
                Column::status("STATUS"),
                Column::right("PID"),
                Column::left("COMMAND").with_max(40),
                Column::muted("STARTED"),
            ]);
            for record in &records {
                table.row(vec![
                    record.id.clone(),
                    record.name.clone().unwrap_or_default(),
                    record.status.to_string(),
                    record.pid.to_string(),
                    record.command.clone(),
                    format_time_ago(record.started_at_ms),
                ]);
            }
            table.render(&mut std::io::stdout());
        }
    }
    Ok(())
}

async fn logs(client: &DaemonClient, id: &str, follow: bool, format: OutputFormat) -> Result<()> {
    if !follow {
        let logs = client.logs(id).await.context("fetching logs")?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&logs)?),
            OutputFormat::Text => {
                if let Some(combined) = logs.get("logs").and_then(|v| v.as_str()) {
                    print!("{combined}");
                }
            }
        }
        return Ok(());
    }

    client
        .stream_ndjson(&format!("/process/{id}/logs/stream"), |line| {
            print_frame_line(line, format);
        })
        .await
        .context("streaming logs")?;
    Ok(())
}

fn print_frame_line(line: &str, format: OutputFormat) {
    if format == OutputFormat::Json {
        println!("{line}");
        return;
    }
    let Ok(frame) = serde_json::from_str::<serde_json::Value>(line) else {
        println!("{line}");
        return;
    };
    match frame.get("type").and_then(|v| v.as_str()) {
        Some("stdout") | Some("stderr") => {
            if let Some(log) = frame.get("log").and_then(|v| v.as_str()) {
                print!("{log}");
            }
        }
        Some("status") => {
            let status = frame.get("status").and_then(|v| v.as_str()).unwrap_or("");
            let message = frame.get("message").and_then(|v| v.as_str()).unwrap_or("");
            eprintln!("[{status}] {message}");
        }
        Some("error") => {
            let message = frame.get("message").and_then(|v| v.as_str()).unwrap_or("");
            eprintln!("error: {message}");
        }
        _ => println!("{line}"),
    }
}

fn print_record(record: &ProcessRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Text => {
            println!("id:       {}", record.id);
            if let Some(name) = &record.name {
                println!("name:     {name}");
            }
            println!("status:   {}", crate::color::status(&record.status.to_string()));
            println!("pid:      {}", record.pid);
            println!("command:  {}", record.command);
            println!("started:  {}", format_time_ago(record.started_at_ms));
            if let Some(code) = record.exit_code {
                println!("exit:     {code}");
            }
        }
    }
    Ok(())
}
