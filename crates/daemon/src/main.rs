// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sandboxd: the HTTP daemon binary (spec.md §6).
//!
//! Unlike a user-level daemon with a lock file and a single persistent
//! client, this binds a TCP listener directly and serves any number of
//! concurrent callers; there is no socket lock to acquire.

use sandbox_daemon::state::AppState;
use sandbox_daemon::{build_router, checkpoint, env, startup, SHUTDOWN_DRAIN};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("sandboxd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("sandboxd {}", env!("CARGO_PKG_VERSION"));
                println!("Sandbox agent daemon - process supervisor, filesystem core, and watcher");
                println!();
                println!("USAGE:");
                println!("    sandboxd");
                println!();
                println!("Configured entirely via environment variables; see SANDBOX_* in the");
                println!("daemon's env module for the full list.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: sandboxd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = env::Config::load();
    let _log_guard = setup_logging(&config)?;

    info!("starting sandboxd");

    let state = AppState::new(config.clone());
    startup::adopt_all(&state).await;
    checkpoint::spawn_periodic_checkpoint(state.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let router = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);

    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, draining"),
            _ = sigint.recv() => info!("received SIGINT, draining"),
        }
    });

    // Bound how long in-flight requests get to finish once a shutdown signal
    // fires (SPEC_FULL.md §12); a hung connection no longer blocks exit.
    if tokio::time::timeout(SHUTDOWN_DRAIN, serve).await.is_err() {
        tracing::warn!("drain window elapsed before all connections closed");
    }

    let final_snapshot = checkpoint::build_snapshot(&state);
    if let Err(e) = sandbox_storage::snapshot::save(&config.state_file, &final_snapshot) {
        tracing::warn!(error = %e, "failed to save final snapshot on shutdown");
    }

    info!("sandboxd stopped");
    Ok(())
}

fn setup_logging(
    config: &env::Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "SANDBOX_LOG_FILE has no file name")
            })?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer))
        .init();

    Ok(guard)
}
