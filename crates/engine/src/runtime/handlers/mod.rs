// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handling for the runtime

mod intake;
mod phases;
mod startup;
mod teardown;

use super::Runtime;
use crate::error::EngineError;
use ota_adapters::{ContentHandler, DeviceControl, ReportAck, ReportSink};
use ota_core::Event;
use ota_storage::SnapshotWriter;
use tracing::{debug, info};

impl<H, T, D, W> Runtime<H, T, D, W>
where
    H: ContentHandler,
    T: ReportSink,
    D: DeviceControl,
    W: SnapshotWriter,
{
    /// Handle an incoming event.
    ///
    /// Errors are per-event; the runtime stays ready for the next one.
    pub async fn handle_event(&mut self, event: Event) -> Result<(), EngineError> {
        debug!(event = %event.log_summary(), "handling event");
        match event {
            Event::InstructionReceived { payload } => self.handle_instruction(&payload).await,

            Event::StepCompleted {
                workflow_id,
                generation,
                step,
                outcome,
            } => {
                self.handle_step_completed(&workflow_id, generation, step, outcome)
                    .await
            }

            Event::ReportRetryTick => {
                self.gateway.retry_rejected().await;
                Ok(())
            }

            Event::Shutdown => {
                // The snapshot already reflects the last durable transition;
                // an interrupted phase re-runs on next start.
                info!(live = self.slot.live().is_some(), "shutdown requested");
                Ok(())
            }
        }
    }

    /// Apply a transport acknowledgement for an earlier report.
    pub async fn handle_ack(&mut self, ack: ReportAck) {
        let workflow_id = ack.workflow_id.clone();
        let Some(state) = self.gateway.handle_ack(ack).await else {
            return;
        };
        if let Some(live) = self
            .slot
            .live_mut()
            .filter(|l| l.workflow_id() == &workflow_id)
        {
            live.handle_mut().results_mut().record_reported(state);
        }
    }
}
