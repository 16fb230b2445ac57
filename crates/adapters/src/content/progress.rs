// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Download progress notifications.

use ota_core::{FileId, WorkflowId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
    Error,
}

/// One progress notification for a file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub workflow_id: WorkflowId,
    pub file_id: FileId,
    pub state: DownloadState,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
}

impl DownloadProgress {
    /// Percentage complete, capped at 100.
    pub fn percentage(&self) -> u8 {
        if self.bytes_total == 0 {
            return 0;
        }
        (self.bytes_transferred.saturating_mul(100) / self.bytes_total).min(100) as u8
    }
}

/// Receives progress notifications. Fire-and-forget, best-effort.
pub trait ProgressSink: Send + Sync + 'static {
    fn on_progress(&self, progress: DownloadProgress);
}

/// Writes progress to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn on_progress(&self, p: DownloadProgress) {
        tracing::debug!(
            workflow_id = %p.workflow_id,
            file_id = %p.file_id,
            state = ?p.state,
            bytes = p.bytes_transferred,
            total = p.bytes_total,
            "download progress",
        );
    }
}

/// Collects every notification, for assertions.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    updates: parking_lot::Mutex<Vec<DownloadProgress>>,
}

#[cfg(any(test, feature = "test-support"))]
impl CollectingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<DownloadProgress> {
        self.updates.lock().clone()
    }

    pub fn last(&self) -> Option<DownloadProgress> {
        self.updates.lock().last().cloned()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ProgressSink for CollectingProgressSink {
    fn on_progress(&self, progress: DownloadProgress) {
        self.updates.lock().push(progress);
    }
}
