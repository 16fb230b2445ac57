// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure, cancellation and teardown of the live workflow

use super::super::Runtime;
use crate::document::Report;
use crate::error::EngineError;
use ota_adapters::{ContentHandler, DeviceControl, ReportSink};
use ota_core::{CancellationType, UpdateResult, UpdateState};
use ota_storage::SnapshotWriter;
use std::sync::Arc;
use tracing::{error, info, warn};

impl<H, T, D, W> Runtime<H, T, D, W>
where
    H: ContentHandler,
    T: ReportSink,
    D: DeviceControl,
    W: SnapshotWriter,
{
    /// Halt the sequence in `Failed`. The handle stays live until it is
    /// superseded or cancelled.
    pub(crate) async fn fail_workflow(&mut self, result: UpdateResult) -> Result<(), EngineError> {
        let Some(live) = self.slot.live_mut() else {
            return Ok(());
        };
        warn!(workflow_id = %live.workflow_id(), %result, "workflow failed");
        let handle = live.handle_mut();
        handle.set_operation_in_progress(false);
        handle.set_state_and_result(UpdateState::Failed, result);

        if let Err(e) = self.persist() {
            warn!(error = %e, "could not record failed state");
        }
        self.report_live().await;
        Ok(())
    }

    /// The live workflow yielded to a cancellation of `kind`.
    ///
    /// A normal cancel reports `Failed` with `Failure_Cancelled`; replacement
    /// and retry hand over silently to the pending instruction.
    pub(crate) async fn finish_cancelled(
        &mut self,
        kind: CancellationType,
    ) -> Result<(), EngineError> {
        let Some(live) = self.slot.live_mut() else {
            return Ok(());
        };
        let workflow_id = live.workflow_id().clone();
        info!(%workflow_id, ?kind, "workflow cancelled");

        if kind == CancellationType::Normal {
            let cancelled = UpdateResult::cancelled();
            live.handle_mut()
                .set_state_and_result(UpdateState::Failed, cancelled.clone());
            self.send_report(&workflow_id, Report::new(UpdateState::Failed, cancelled))
                .await;
        }
        self.teardown().await;

        match self.slot.take_pending() {
            Some(next) => self.start_workflow(next).await,
            None => Ok(()),
        }
    }

    /// Destroy the sandbox, go idle, clear the snapshot and free the slot.
    pub(crate) async fn teardown(&mut self) {
        let Some(live) = self.slot.release() else {
            return;
        };
        let workflow_id = live.workflow_id().clone();
        if live.sandbox_ready() {
            let ctx = live.context(self.work_dir(&workflow_id), Arc::clone(&self.progress));
            self.content.sandbox_destroy(&ctx).await;
        }
        self.content.idle(Some(&workflow_id)).await;
        if let Err(e) = self.store.clear() {
            error!(%workflow_id, error = %e, "failed to clear workflow snapshot");
        }
        info!(%workflow_id, state = %live.handle().state(), "workflow torn down");
    }
}
