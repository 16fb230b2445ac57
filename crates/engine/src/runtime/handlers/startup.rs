// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup: resume an interrupted workflow or go idle

use super::super::Runtime;
use super::phases::{resume_point, ResumePoint};
use crate::error::EngineError;
use ota_adapters::{ContentHandler, DeviceControl, ReportSink};
use ota_core::{
    AgentRestartState, CancellationType, Instruction, SystemRebootState, WorkflowHandle,
};
use ota_storage::{SnapshotWriter, WorkflowSnapshot};
use tracing::{info, warn};

impl<H, T, D, W> Runtime<H, T, D, W>
where
    H: ContentHandler,
    T: ReportSink,
    D: DeviceControl,
    W: SnapshotWriter,
{
    /// Read the snapshot once and either resume its workflow or go idle.
    ///
    /// A reboot or restart recorded in the snapshot is taken to have
    /// happened; the sequence continues after the last persisted state.
    /// A workflow cancelled while its step was running finishes cancelled.
    pub async fn startup(&mut self) -> Result<(), EngineError> {
        let Some(snapshot) = self.store.take_startup_snapshot()? else {
            info!("no workflow to resume");
            self.content.idle(None).await;
            return Ok(());
        };
        if !snapshot.is_resumable() {
            info!(
                workflow_id = %snapshot.workflow_id,
                state = %snapshot.state,
                "snapshot is settled, clearing",
            );
            self.store.clear()?;
            self.content.idle(None).await;
            return Ok(());
        }

        let cancelled = snapshot.cancellation_type == CancellationType::Normal;
        let handle = match restore_handle(snapshot) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "snapshot instruction unreadable, starting clean");
                self.store.clear()?;
                self.content.idle(None).await;
                return Ok(());
            }
        };
        let state = handle.state();
        let target = handle.target_phase();
        let workflow_id = handle.workflow_id().clone();
        self.slot.occupy(handle)?;
        if cancelled {
            info!(%workflow_id, %state, "workflow was cancelled before shutdown");
            return self.finish_cancelled(CancellationType::Normal).await;
        }
        info!(%workflow_id, %state, "resuming workflow");

        match resume_point(state) {
            ResumePoint::Phase(phase) if target.is_some_and(|t| phase > t) => {
                // The requested phase was already reached; wait for a follow-up.
                self.report_live().await;
                Ok(())
            }
            ResumePoint::Phase(phase) => self.begin_phase(phase).await,
            ResumePoint::IdleReport => self.finish_apply().await,
            ResumePoint::Nothing => Ok(()),
        }
    }
}

/// Rebuild a live handle from its snapshot, dropping the reboot and restart
/// markers.
fn restore_handle(snapshot: WorkflowSnapshot) -> Result<WorkflowHandle, EngineError> {
    let instruction = Instruction::parse(&snapshot.instruction)?;
    let mut handle = WorkflowHandle::from_instruction(instruction);
    handle.restore_results(snapshot.results);
    handle.set_state(snapshot.state);
    handle.set_system_reboot_state(SystemRebootState::None);
    handle.set_agent_restart_state(AgentRestartState::None);
    Ok(handle)
}
