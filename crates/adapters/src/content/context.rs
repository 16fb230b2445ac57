// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workflow context handed to content handler callbacks.

use super::progress::{DownloadProgress, DownloadState, ProgressSink};
use ota_core::{
    CancellationFlag, CancellationType, ComponentUpdate, ContentData, FileEntity, FileId,
    StepOutcome, UpdateAction, UpdateResult, UpdateState, WorkflowId,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cancellation flag plus a wakeup for tasks awaiting it.
///
/// The runtime keeps one clone and the phase worker another; writes go
/// through the shared atomic so pollers never see a stale value.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    flag: Arc<CancellationFlag>,
    notify: Arc<Notify>,
}

impl CancelSignal {
    pub fn new(flag: Arc<CancellationFlag>) -> Self {
        Self {
            flag,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Record the cancellation and wake any waiter.
    pub fn cancel(&self, kind: CancellationType) {
        self.flag.set(kind);
        self.notify.notify_waiters();
    }

    pub fn kind(&self) -> CancellationType {
        self.flag.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }

    /// Resolves once any cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Everything a phase callback may read or report for its workflow.
pub struct WorkflowContext {
    workflow_id: WorkflowId,
    action: UpdateAction,
    content: Option<ContentData>,
    work_dir: PathBuf,
    cancel: CancelSignal,
    progress: Arc<dyn ProgressSink>,
    components: Mutex<Vec<ComponentUpdate>>,
    reboot_requested: AtomicBool,
    restart_requested: AtomicBool,
}

impl WorkflowContext {
    pub fn new(
        workflow_id: WorkflowId,
        action: UpdateAction,
        content: Option<ContentData>,
        work_dir: PathBuf,
        cancel: CancelSignal,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            workflow_id,
            action,
            content,
            work_dir,
            cancel,
            progress,
            components: Mutex::new(Vec::new()),
            reboot_requested: AtomicBool::new(false),
            restart_requested: AtomicBool::new(false),
        }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn action(&self) -> UpdateAction {
        self.action
    }

    pub fn content(&self) -> Option<&ContentData> {
        self.content.as_ref()
    }

    pub fn files(&self) -> &[FileEntity] {
        self.content.as_ref().map(|c| c.files.as_slice()).unwrap_or(&[])
    }

    /// Sandbox folder for this workflow's downloads.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_type(&self) -> CancellationType {
        self.cancel.kind()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn report_progress(
        &self,
        file_id: &FileId,
        state: DownloadState,
        bytes_transferred: u64,
        bytes_total: u64,
    ) {
        self.progress.on_progress(DownloadProgress {
            workflow_id: self.workflow_id.clone(),
            file_id: file_id.clone(),
            state,
            bytes_transferred,
            bytes_total,
        });
    }

    /// Record a component's result under `parent` in the workflow's tree.
    pub fn record_component(
        &self,
        parent: &str,
        path: &str,
        state: UpdateState,
        result: UpdateResult,
    ) {
        self.components.lock().push(ComponentUpdate {
            parent: parent.to_string(),
            path: path.to_string(),
            state,
            result,
        });
    }

    /// Ask for a device reboot before the sequence continues.
    pub fn request_reboot(&self) {
        self.reboot_requested.store(true, Ordering::SeqCst);
    }

    /// Ask for an agent restart before the sequence continues.
    pub fn request_agent_restart(&self) {
        self.restart_requested.store(true, Ordering::SeqCst);
    }

    /// Package a finished step's result with everything recorded during it.
    pub fn finish_step(&self, result: UpdateResult) -> StepOutcome {
        StepOutcome {
            result,
            components: std::mem::take(&mut *self.components.lock()),
            reboot_requested: self.reboot_requested.swap(false, Ordering::SeqCst),
            restart_requested: self.restart_requested.swap(false, Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
