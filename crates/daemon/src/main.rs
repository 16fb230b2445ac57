// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OTA update agent daemon (otad)
//!
//! Owns the single live update workflow and drives it from cloud
//! instructions.
//!
//! Architecture:
//! - Intake Task: reads one instruction per stdin line and feeds the event channel,
//!   then asks for shutdown at end of input
//! - Engine Loop: main task processing events, report acks and retry ticks sequentially

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;

use ota_core::Event;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::lifecycle::{Config, LifecycleError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("otad {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("otad {}", env!("CARGO_PKG_VERSION"));
                println!("OTA update agent - drives one update workflow at a time");
                println!();
                println!("USAGE:");
                println!("    otad");
                println!();
                println!("Reads one JSON instruction per line on stdin and reports");
                println!("workflow state through the configured transport. Exits at");
                println!("end of input or on SIGTERM/SIGINT.");
                println!();
                println!("ENVIRONMENT:");
                println!("    OTA_CONFIG       Agent config file [default: {}]", env::DEFAULT_CONFIG_PATH);
                println!("    OTA_STATE_DIR    State directory [default: ~/.local/state/otad]");
                println!("    RUST_LOG         Log filter [default: info]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: otad [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!("Starting update agent");

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("otad is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    spawn_stdin_intake(daemon.event_tx.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // NOTE: Must be created outside the loop - tokio::select! re-evaluates
    // branches on each iteration, so a sleep() inside would reset on every
    // event and rejected reports would never be resent during activity.
    let mut retry_tick = tokio::time::interval(daemon.runtime.config().report_retry_interval);

    info!(
        state_dir = %config.state_dir.display(),
        agent = daemon.agent.agent().map(|a| a.name.as_str()).unwrap_or_default(),
        "Daemon ready",
    );

    // Set at end of input; the loop exits once no step is running.
    let mut draining = false;

    loop {
        tokio::select! {
            // Acks first so last-reported state is current before the next event
            biased;

            Some(ack) = daemon.ack_rx.recv() => {
                daemon.runtime.handle_ack(ack).await;
            }

            event = daemon.event_rx.recv() => {
                match event {
                    Some(Event::Shutdown) => {
                        daemon.process_event(Event::Shutdown).await;
                        info!("End of input, draining in-flight step...");
                        draining = true;
                    }
                    Some(event) => daemon.process_event(event).await,
                    None => {
                        info!("Event channel closed, shutting down...");
                        break;
                    }
                }
                if draining && !daemon.step_in_flight() {
                    info!("No step in flight, shutting down...");
                    break;
                }
            }

            _ = retry_tick.tick() => {
                daemon.process_event(Event::ReportRetryTick).await;
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    daemon.shutdown()?;
    info!("Daemon stopped");
    Ok(())
}

/// Feed each non-empty stdin line to the runtime as an instruction.
fn spawn_stdin_intake(event_tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let payload = line.trim();
                    if payload.is_empty() {
                        continue;
                    }
                    let event = Event::InstructionReceived {
                        payload: payload.to_string(),
                    };
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
        let _ = event_tx.send(Event::Shutdown).await;
    });
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- otad: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- otad: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}
