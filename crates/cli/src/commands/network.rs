// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `network` subcommand: port listings and live port-event monitoring
//! (spec.md §3 `PortInfo`, §6).

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use crate::table::{Column, Table};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use sandbox_core::PortState;

#[derive(Args)]
pub struct NetworkArgs {
    #[command(subcommand)]
    pub command: NetworkCommand,
}

#[derive(Subcommand)]
pub enum NetworkCommand {
    /// List the ports currently open by a process
    Ports { pid: u32 },
    /// Start or stop live port-event monitoring for a process
    #[command(subcommand)]
    Monitor(MonitorCommand),
}

#[derive(Subcommand)]
pub enum MonitorCommand {
    Start { pid: u32 },
    Stop { pid: u32 },
}

pub async fn handle(client: &DaemonClient, command: NetworkCommand, format: OutputFormat) -> Result<()> {
    match command {
        NetworkCommand::Ports { pid } => ports(client, pid, format).await,
        NetworkCommand::Monitor(MonitorCommand::Start { pid }) => {
            client.network_monitor_start(pid).await.context("starting port monitor")?;
            println!("monitoring started for pid {pid}");
            Ok(())
        }
        NetworkCommand::Monitor(MonitorCommand::Stop { pid }) => {
            client.network_monitor_stop(pid).await.context("stopping port monitor")?;
            println!("monitoring stopped for pid {pid}");
            Ok(())
        }
    }
}

async fn ports(client: &DaemonClient, pid: u32, format: OutputFormat) -> Result<()> {
    let ports = client.network_ports(pid).await.context("listing ports")?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ports)?),
        OutputFormat::Text => {
            let mut table = Table::new(vec![
                Column::right("PID"),
                Column::right("PORT"),
                Column::status("STATE"),
            ]);
            for port in &ports {
                let state = match port.state {
                    PortState::Open => "open",
                    PortState::Closed => "closed",
                };
                table.row(vec![port.pid.to_string(), port.local_port.to_string(), state.to_string()]);
            }
            table.render(&mut std::io::stdout());
        }
    }
    Ok(())
}
