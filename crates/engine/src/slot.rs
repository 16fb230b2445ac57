// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single live-workflow slot.
//!
//! At most one workflow drives phases at a time. A newer instruction that
//! supersedes it waits here as the pending handle until the live one yields.

use crate::error::EngineError;
use ota_adapters::{CancelSignal, ProgressSink, WorkflowContext};
use ota_core::{CancellationType, WorkflowHandle, WorkflowId};
use std::path::PathBuf;
use std::sync::Arc;

/// A workflow that owns the slot.
#[derive(Debug)]
pub struct LiveWorkflow {
    handle: WorkflowHandle,
    generation: u64,
    cancel: CancelSignal,
    sandbox_ready: bool,
}

impl LiveWorkflow {
    fn new(handle: WorkflowHandle, generation: u64) -> Self {
        let cancel = CancelSignal::new(handle.cancellation());
        Self {
            handle,
            generation,
            cancel,
            sandbox_ready: false,
        }
    }

    pub fn handle(&self) -> &WorkflowHandle {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut WorkflowHandle {
        &mut self.handle
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        self.handle.workflow_id()
    }

    /// Distinguishes this occupancy from earlier ones with the same id.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record a cancellation and wake a phase awaiting it.
    pub fn request_cancel(&self, kind: CancellationType) {
        self.cancel.cancel(kind);
    }

    pub(crate) fn sandbox_ready(&self) -> bool {
        self.sandbox_ready
    }

    pub(crate) fn mark_sandbox_ready(&mut self) {
        self.sandbox_ready = true;
    }

    /// Build the context handed to content handler callbacks.
    pub(crate) fn context(
        &self,
        work_dir: PathBuf,
        progress: Arc<dyn ProgressSink>,
    ) -> WorkflowContext {
        WorkflowContext::new(
            self.workflow_id().clone(),
            self.handle.action(),
            self.handle.instruction().content().cloned(),
            work_dir,
            self.cancel.clone(),
            progress,
        )
    }
}

/// Owner of the live workflow and the one waiting to replace it.
#[derive(Debug, Default)]
pub struct WorkflowSlot {
    live: Option<LiveWorkflow>,
    pending: Option<WorkflowHandle>,
    generation: u64,
}

impl WorkflowSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` the live workflow.
    ///
    /// Fails with [`EngineError::Busy`] while another workflow is live; the
    /// caller must cancel and release it first.
    pub fn occupy(&mut self, handle: WorkflowHandle) -> Result<&mut LiveWorkflow, EngineError> {
        if let Some(live) = &self.live {
            return Err(EngineError::Busy(live.workflow_id().clone()));
        }
        self.generation += 1;
        Ok(self.live.insert(LiveWorkflow::new(handle, self.generation)))
    }

    pub fn live(&self) -> Option<&LiveWorkflow> {
        self.live.as_ref()
    }

    pub fn live_mut(&mut self) -> Option<&mut LiveWorkflow> {
        self.live.as_mut()
    }

    /// The live workflow, only if it is `workflow_id` at `generation`.
    pub fn live_at(&mut self, workflow_id: &WorkflowId, generation: u64) -> Option<&mut LiveWorkflow> {
        self.live
            .as_mut()
            .filter(|l| l.generation == generation && l.workflow_id() == workflow_id)
    }

    pub fn release(&mut self) -> Option<LiveWorkflow> {
        self.live.take()
    }

    /// Queue `handle` to start once the live workflow yields.
    ///
    /// Returns the handle it displaced, if any; the newest instruction wins.
    pub fn set_pending(&mut self, handle: WorkflowHandle) -> Option<WorkflowHandle> {
        self.pending.replace(handle)
    }

    pub fn take_pending(&mut self) -> Option<WorkflowHandle> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&WorkflowHandle> {
        self.pending.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.live.is_none()
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
