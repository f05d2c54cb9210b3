// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sandboxctl: operator CLI for the sandboxd HTTP surface (spec.md §6).

use anyhow::Result;
use clap::{Parser, Subcommand};
use sandboxctl::client::DaemonClient;
use sandboxctl::commands::{filesystem, network, process, upgrade, watch};
use sandboxctl::output::OutputFormat;
use sandboxctl::{color, env};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sandboxctl", version, about = "Operator CLI for sandboxd", styles = color::styles())]
struct Cli {
    /// Base URL of the daemon (default: $SANDBOXCTL_URL or http://127.0.0.1:8080)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage supervised processes
    #[command(subcommand)]
    Process(process::ProcessCommand),
    /// Read, write, and browse the sandbox filesystem
    #[command(subcommand)]
    Fs(filesystem::FsCommand),
    /// Stream filesystem-change events for a path
    Watch(watch::WatchArgs),
    /// Inspect and monitor process ports
    Network(network::NetworkArgs),
    /// Trigger and inspect hot-upgrades
    Upgrade(upgrade::UpgradeArgs),
    /// Check daemon liveness
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", color::status("error:"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let base_url = cli.url.unwrap_or_else(env::daemon_url);
    let timeout = Duration::from_millis(env::request_timeout_ms());
    let client = DaemonClient::new(base_url, timeout)?;
    let format = cli.output;

    match cli.command {
        Commands::Process(cmd) => process::handle(&client, cmd, format).await,
        Commands::Fs(cmd) => filesystem::handle(&client, cmd, format).await,
        Commands::Watch(args) => watch::handle(&client, args, format).await,
        Commands::Network(args) => network::handle(&client, args.command, format).await,
        Commands::Upgrade(args) => upgrade::handle(&client, args.command, format).await,
        Commands::Health => {
            let health = client.health().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
                OutputFormat::Text => println!("{}", serde_json::to_string_pretty(&health)?),
            }
            Ok(())
        }
    }
}
