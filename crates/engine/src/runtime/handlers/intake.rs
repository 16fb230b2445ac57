// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instruction intake: parse, decide, and act on the live workflow

use super::super::Runtime;
use super::phases::{resume_point, ResumePoint};
use crate::cancellation::{decide, IntakeDecision};
use crate::error::EngineError;
use crate::slot::LiveWorkflow;
use ota_adapters::{ContentHandler, DeviceControl, ReportSink};
use ota_core::{CancellationType, Phase, Step, UpdateAction, WorkflowHandle};
use ota_storage::SnapshotWriter;
use tracing::{info, warn};

impl<H, T, D, W> Runtime<H, T, D, W>
where
    H: ContentHandler,
    T: ReportSink,
    D: DeviceControl,
    W: SnapshotWriter,
{
    /// A raw instruction arrived from the cloud.
    ///
    /// Malformed payloads are rejected before anything is created or
    /// reported.
    pub(crate) async fn handle_instruction(&mut self, payload: &str) -> Result<(), EngineError> {
        let incoming = WorkflowHandle::parse(payload)?;
        let decision = decide(self.slot.live().map(LiveWorkflow::handle), &incoming);
        info!(
            workflow_id = %incoming.workflow_id(),
            action = ?incoming.action(),
            ?decision,
            "instruction received",
        );

        match decision {
            IntakeDecision::Start => self.start_workflow(incoming).await,
            IntakeDecision::Cancel => self.request_cancel(CancellationType::Normal).await,
            IntakeDecision::Supersede(kind) => {
                if let Some(displaced) = self.slot.set_pending(incoming) {
                    info!(workflow_id = %displaced.workflow_id(), "pending instruction superseded");
                }
                self.request_cancel(kind).await
            }
            IntakeDecision::Continue => self.continue_live(incoming).await,
            IntakeDecision::Ignore(reason) => {
                info!(%reason, "instruction ignored");
                Ok(())
            }
        }
    }

    /// Occupy the slot with `handle` and run its first step.
    pub(crate) async fn start_workflow(&mut self, handle: WorkflowHandle) -> Result<(), EngineError> {
        let workflow_id = handle.workflow_id().clone();
        let action = handle.action();
        self.gateway.prune_settled(&workflow_id);
        self.slot.occupy(handle)?;
        info!(%workflow_id, ?action, "workflow started");

        if action == UpdateAction::ProcessDeployment {
            self.spawn_step(Step::IsInstalled);
            Ok(())
        } else {
            self.begin_phase(Phase::Download).await
        }
    }

    /// Flag the live workflow; finish at once if no step is running.
    async fn request_cancel(&mut self, kind: CancellationType) -> Result<(), EngineError> {
        let Some(live) = self.slot.live() else {
            return Ok(());
        };
        live.request_cancel(kind);
        if live.handle().operation_in_progress() {
            info!(
                workflow_id = %live.workflow_id(),
                ?kind,
                "cancellation requested, waiting for step to yield",
            );
            // A restart before the step yields must still see the cancel.
            if let Err(e) = self.persist() {
                warn!(error = %e, "could not record cancellation");
            }
            return Ok(());
        }
        self.finish_cancelled(kind).await
    }

    /// Same workflow asks for a later phase than it has reached.
    async fn continue_live(&mut self, incoming: WorkflowHandle) -> Result<(), EngineError> {
        let Some(live) = self.slot.live_mut() else {
            return Ok(());
        };
        live.handle_mut()
            .adopt_instruction(incoming.into_instruction());
        match resume_point(live.handle().state()) {
            ResumePoint::Phase(phase) => self.begin_phase(phase).await,
            ResumePoint::IdleReport => self.finish_apply().await,
            ResumePoint::Nothing => Ok(()),
        }
    }
}
