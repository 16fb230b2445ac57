// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulated content handler.
//!
//! Walks through each phase without touching the device: downloads are
//! paced progress notifications, installs and applies return scripted
//! results. Used by `otad` when no real handler is configured.

use super::{ContentHandler, DownloadState, WorkflowContext};
use async_trait::async_trait;
use ota_core::{code, erc, UpdateResult, WorkflowId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Results and pacing for each simulated phase.
#[derive(Debug, Clone)]
pub struct SimulatorScript {
    pub download: UpdateResult,
    pub install: UpdateResult,
    pub apply: UpdateResult,
    /// Pause between progress chunks and before install/apply return.
    pub step_delay: Duration,
    /// Progress notifications per file.
    pub chunks: u32,
}

impl Default for SimulatorScript {
    fn default() -> Self {
        Self {
            download: UpdateResult::new(code::DOWNLOAD_SUCCESS),
            install: UpdateResult::new(code::INSTALL_SUCCESS),
            apply: UpdateResult::new(code::APPLY_SUCCESS),
            step_delay: Duration::from_millis(100),
            chunks: 4,
        }
    }
}

#[derive(Clone, Default)]
pub struct SimulatorContentHandler {
    script: SimulatorScript,
    /// Installed criteria satisfied by successful applies.
    installed: Arc<Mutex<HashSet<String>>>,
}

impl SimulatorContentHandler {
    pub fn new(script: SimulatorScript) -> Self {
        Self {
            script,
            installed: Arc::default(),
        }
    }

    /// Sleep one step, returning early with `true` if cancelled.
    async fn pause(&self, ctx: &WorkflowContext) -> bool {
        tokio::select! {
            _ = ctx.cancelled() => true,
            _ = tokio::time::sleep(self.script.step_delay) => ctx.is_cancelled(),
        }
    }
}

#[async_trait]
impl ContentHandler for SimulatorContentHandler {
    async fn is_installed(&self, ctx: &WorkflowContext) -> UpdateResult {
        let Some(content) = ctx.content() else {
            return UpdateResult::failure(erc::MALFORMED_INSTRUCTION);
        };
        if self.installed.lock().contains(&content.installed_criteria) {
            UpdateResult::new(code::IS_INSTALLED_INSTALLED)
        } else {
            UpdateResult::new(code::IS_INSTALLED_NOT_INSTALLED)
        }
    }

    async fn sandbox_create(&self, ctx: &WorkflowContext) -> UpdateResult {
        match tokio::fs::create_dir_all(ctx.work_dir()).await {
            Ok(()) => UpdateResult::new(code::SUCCESS),
            Err(e) => UpdateResult::failure(erc::SANDBOX_CREATE_FAILED).with_details(e.to_string()),
        }
    }

    async fn sandbox_destroy(&self, ctx: &WorkflowContext) {
        if let Err(e) = tokio::fs::remove_dir_all(ctx.work_dir()).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %ctx.work_dir().display(), error = %e, "sandbox removal failed");
            }
        }
    }

    async fn download(&self, ctx: &WorkflowContext) -> UpdateResult {
        let chunks = u64::from(self.script.chunks.max(1));
        for file in ctx.files() {
            let total = file.size_in_bytes;
            ctx.report_progress(&file.file_id, DownloadState::NotStarted, 0, total);
            for chunk in 1..=chunks {
                if self.pause(ctx).await {
                    ctx.report_progress(&file.file_id, DownloadState::Cancelled, 0, total);
                    return UpdateResult::cancelled();
                }
                let done = total * chunk / chunks;
                let state = if chunk == chunks {
                    DownloadState::Completed
                } else {
                    DownloadState::InProgress
                };
                ctx.report_progress(&file.file_id, state, done, total);
            }
        }
        self.script.download.clone()
    }

    async fn install(&self, ctx: &WorkflowContext) -> UpdateResult {
        if self.pause(ctx).await {
            return UpdateResult::cancelled();
        }
        self.script.install.clone()
    }

    async fn apply(&self, ctx: &WorkflowContext) -> UpdateResult {
        if self.pause(ctx).await {
            return UpdateResult::cancelled();
        }
        let result = self.script.apply.clone();
        if result.is_success() {
            if let Some(content) = ctx.content() {
                self.installed
                    .lock()
                    .insert(content.installed_criteria.clone());
            }
        }
        result
    }

    async fn idle(&self, workflow_id: Option<&WorkflowId>) {
        tracing::debug!(workflow_id = ?workflow_id.map(WorkflowId::as_str), "simulator idle");
    }
}

#[cfg(test)]
#[path = "simulator_tests.rs"]
mod tests;
