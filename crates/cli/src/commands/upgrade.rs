// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `upgrade` subcommand: trigger and observe the hot-upgrade pipeline
//! (spec.md §4.3, §6).

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct UpgradeArgs {
    #[command(subcommand)]
    pub command: UpgradeCommand,
}

#[derive(Subcommand)]
pub enum UpgradeCommand {
    /// Start a hot-upgrade to a new version
    Start {
        /// Target version identifier
        #[arg(long)]
        version: String,
        /// Base URL to download the new binary from
        #[arg(long)]
        base_url: String,
    },
    /// Show the status of the last or current upgrade attempt
    Status,
}

pub async fn handle(client: &DaemonClient, command: UpgradeCommand, format: OutputFormat) -> Result<()> {
    match command {
        UpgradeCommand::Start { version, base_url } => {
            client.upgrade_start(&version, &base_url).await.context("starting upgrade")?;
            println!("upgrade to {version} started");
            Ok(())
        }
        UpgradeCommand::Status => {
            let status = client.upgrade_status().await.context("fetching upgrade status")?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
                OutputFormat::Text => {
                    println!("status: {}", crate::color::status(&status.status));
                    println!("step:   {:?}", status.step);
                    if let Some(version) = &status.version {
                        println!("version: {version}");
                    }
                    if let Some(error) = &status.error {
                        println!("error:  {error}");
                    }
                    if status.bytes_downloaded > 0 {
                        println!("bytes:  {}", status.bytes_downloaded);
                    }
                }
            }
            Ok(())
        }
    }
}
