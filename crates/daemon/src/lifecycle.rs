// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, resume, shutdown.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use ota_adapters::{
    LogProgressSink, LogReportSink, NoOpDeviceControl, ReportAck, SimulatorContentHandler,
    SimulatorScript, TracedContent, TracedDevice, TracedSink,
};
use ota_core::Event;
use ota_daemon::{AgentConfig, ConfigError};
use ota_engine::{EngineError, Runtime, RuntimeDeps};
use ota_storage::{FsSnapshotWriter, PersistenceStore};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Daemon runtime with concrete adapter types (wrapped with tracing)
pub type DaemonRuntime = Runtime<
    TracedContent<SimulatorContentHandler>,
    TracedSink<LogReportSink>,
    TracedDevice<NoOpDeviceControl>,
    FsSnapshotWriter,
>;

/// Capacity of the runtime event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/otad)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the agent configuration file
    pub config_path: PathBuf,
}

impl Config {
    /// Resolve paths from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        Ok(Self::for_state_dir(state_dir, crate::env::config_path()))
    }

    pub fn for_state_dir(state_dir: PathBuf, config_path: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("otad.pid"),
            log_path: state_dir.join("otad.log"),
            config_path,
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub agent: AgentConfig,
    pub runtime: DaemonRuntime,
    /// Sender for events fed in from outside the runtime (stdin, timers)
    pub event_tx: mpsc::Sender<Event>,
    pub event_rx: mpsc::Receiver<Event>,
    pub ack_rx: mpsc::UnboundedReceiver<ReportAck>,
}

impl DaemonState {
    /// Route one event into the runtime. Errors are logged, never fatal.
    pub async fn process_event(&mut self, event: Event) {
        let summary = event.log_summary();
        if let Err(e) = self.runtime.handle_event(event).await {
            match e {
                EngineError::Busy(ref workflow_id) => {
                    warn!(%workflow_id, event = %summary, "instruction rejected: {}", e)
                }
                _ => error!(event = %summary, "error processing event: {}", e),
            }
        }
    }

    /// Whether a phase callback is still running for the live workflow.
    pub fn step_in_flight(&self) -> bool {
        self.runtime
            .live()
            .is_some_and(|live| live.handle().operation_in_progress())
    }

    /// Shutdown the daemon gracefully.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // Remove PID file; the lock itself is released when lock_file drops
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // The lock file belongs to the running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock before anything touches the snapshot. Don't truncate first,
    // that would wipe the running daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let agent = AgentConfig::load(&config.config_path)?;
    if let Some(entry) = agent.agent() {
        info!(
            agent = %entry.name,
            manufacturer = %agent.manufacturer,
            model = %agent.model,
            connection = %entry.connection_type,
            "loaded agent config",
        );
    }

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();

    let deps = RuntimeDeps {
        content: TracedContent::new(SimulatorContentHandler::new(SimulatorScript::default())),
        sink: TracedSink::new(LogReportSink::new()),
        device: TracedDevice::new(NoOpDeviceControl::new()),
        store: PersistenceStore::open(&config.state_dir),
        progress: Arc::new(LogProgressSink),
    };
    let mut runtime = Runtime::new(
        deps,
        agent.runtime_config(&config.state_dir),
        event_tx.clone(),
        ack_tx,
    );

    // A broken snapshot must not keep the device from taking new updates.
    match runtime.startup().await {
        Ok(()) => {}
        Err(EngineError::Persistence(e)) => {
            error!(error = %e, "could not read workflow snapshot, starting clean");
        }
        Err(e) => return Err(e.into()),
    }
    if let Some(live) = runtime.live() {
        info!(workflow_id = %live.workflow_id(), state = %live.handle().state(), "resumed workflow");
    }

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        agent,
        runtime,
        event_tx,
        event_rx,
        ack_rx,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
