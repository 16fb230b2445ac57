// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime driving the live OTA workflow

mod handlers;

use crate::document::{DocumentBuilder, Report, ReportShape, DEFAULT_NAMESPACE};
use crate::reporter::ReportingGateway;
use crate::slot::{LiveWorkflow, WorkflowSlot};
use ota_adapters::{ContentHandler, DeviceControl, ProgressSink, ReportAck, ReportSink};
use ota_core::{erc, Event, UpdateResult, UpdateState, WorkflowHandle, WorkflowId};
use ota_storage::{PersistenceStore, SnapshotError, SnapshotWriter, WorkflowSnapshot};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default number of snapshot write attempts per transition.
pub const DEFAULT_PERSISTENCE_ATTEMPTS: u32 = 3;

/// Default interval between resends of rejected reports.
pub const DEFAULT_REPORT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Root state directory (e.g. ~/.local/state/otad)
    pub state_dir: PathBuf,
    pub report_shape: ReportShape,
    pub namespace: String,
    /// Snapshot write attempts before a transition counts as failed.
    pub persistence_attempts: u32,
    pub report_retry_interval: Duration,
}

impl RuntimeConfig {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            report_shape: ReportShape::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            persistence_attempts: DEFAULT_PERSISTENCE_ATTEMPTS,
            report_retry_interval: DEFAULT_REPORT_RETRY_INTERVAL,
        }
    }

    /// Parent of the per-workflow sandbox folders.
    pub fn downloads_dir(&self) -> PathBuf {
        self.state_dir.join("downloads")
    }
}

/// Runtime adapter dependencies
pub struct RuntimeDeps<H, T, D, W: SnapshotWriter> {
    pub content: H,
    pub sink: T,
    pub device: D,
    pub store: PersistenceStore<W>,
    pub progress: Arc<dyn ProgressSink>,
}

/// Runtime that owns the live workflow and drives it through its phases.
///
/// Events arrive one at a time from the daemon loop. Phase callbacks run on
/// spawned tasks and come back as [`Event::StepCompleted`]; report
/// acknowledgements come back through [`Runtime::handle_ack`].
pub struct Runtime<H, T, D, W: SnapshotWriter> {
    pub(crate) content: H,
    pub(crate) device: D,
    pub(crate) store: PersistenceStore<W>,
    pub(crate) progress: Arc<dyn ProgressSink>,
    pub(crate) gateway: ReportingGateway<T>,
    pub(crate) slot: WorkflowSlot,
    pub(crate) config: RuntimeConfig,
    pub(crate) event_tx: mpsc::Sender<Event>,
}

impl<H, T, D, W> Runtime<H, T, D, W>
where
    H: ContentHandler,
    T: ReportSink,
    D: DeviceControl,
    W: SnapshotWriter,
{
    /// Create a new runtime
    pub fn new(
        deps: RuntimeDeps<H, T, D, W>,
        config: RuntimeConfig,
        event_tx: mpsc::Sender<Event>,
        ack_tx: mpsc::UnboundedSender<ReportAck>,
    ) -> Self {
        let builder = DocumentBuilder::new(config.report_shape, config.namespace.clone());
        Self {
            content: deps.content,
            device: deps.device,
            store: deps.store,
            progress: deps.progress,
            gateway: ReportingGateway::new(deps.sink, builder, ack_tx),
            slot: WorkflowSlot::new(),
            config,
            event_tx,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The workflow currently driving phases, if any.
    pub fn live(&self) -> Option<&LiveWorkflow> {
        self.slot.live()
    }

    /// Instruction waiting for the live workflow to yield.
    pub fn pending(&self) -> Option<&WorkflowHandle> {
        self.slot.pending()
    }

    /// Last state the transport acknowledged for `workflow_id`.
    pub fn last_reported_state(&self, workflow_id: &WorkflowId) -> Option<UpdateState> {
        self.gateway.last_reported_state(workflow_id)
    }

    pub(crate) fn work_dir(&self, workflow_id: &WorkflowId) -> PathBuf {
        self.config.downloads_dir().join(workflow_id.as_str())
    }

    /// Durably record the live workflow, retrying up to the configured
    /// number of attempts.
    pub(crate) fn persist(&self) -> Result<(), SnapshotError> {
        let Some(live) = self.slot.live() else {
            return Ok(());
        };
        let snapshot = WorkflowSnapshot::capture(live.handle());
        let attempts = self.config.persistence_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.save(&snapshot) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!(
                        workflow_id = %snapshot.workflow_id,
                        attempt,
                        error = %e,
                        "snapshot write failed, retrying",
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Report the live workflow's current state and effective result.
    pub(crate) async fn report_live(&mut self) {
        let Some(live) = self.slot.live() else {
            return;
        };
        let workflow_id = live.workflow_id().clone();
        let report = Report::new(live.handle().state(), reported_result(live.handle()));
        self.send_report(&workflow_id, report).await;
    }

    pub(crate) async fn send_report(&mut self, workflow_id: &WorkflowId, report: Report) {
        let state = report.state;
        match self.gateway.submit(workflow_id, report).await {
            Ok(submission) => debug!(%workflow_id, %state, ?submission, "report submitted"),
            Err(e) => warn!(%workflow_id, %state, error = %e, "report held for retry"),
        }
    }
}

/// Result placed in a report: a failure anywhere in the tree wins,
/// otherwise the root's own result.
pub(crate) fn reported_result(handle: &WorkflowHandle) -> UpdateResult {
    match handle.aggregate_result() {
        Ok(aggregate) if aggregate.is_failure() => aggregate,
        _ => handle.results().root().result().clone(),
    }
}

pub(crate) fn persistence_failure(error: &SnapshotError) -> UpdateResult {
    UpdateResult::failure(erc::PERSISTENCE_WRITE_FAILED).with_details(error.to_string())
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;
