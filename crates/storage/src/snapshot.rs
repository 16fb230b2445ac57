// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable copy of a live workflow's resumable fields.
//!
//! A snapshot is written before any phase that could be interrupted by a
//! reboot or restart, and read once at startup to decide whether to resume.

use chrono::{DateTime, Utc};
use ota_core::{
    AgentRestartState, CancellationType, ResultTree, SystemRebootState, UpdateState, WorkflowHandle,
    WorkflowId,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current snapshot format version.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub version: u32,
    pub workflow_id: WorkflowId,
    pub state: UpdateState,
    pub cancellation_type: CancellationType,
    pub system_reboot_state: SystemRebootState,
    pub agent_restart_state: AgentRestartState,
    pub results: ResultTree,
    /// Instruction text exactly as received; re-parsed on resume.
    pub instruction: String,
    pub saved_at: DateTime<Utc>,
}

impl WorkflowSnapshot {
    /// Capture the resumable fields of a live handle.
    pub fn capture(handle: &WorkflowHandle) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            workflow_id: handle.workflow_id().clone(),
            state: handle.state(),
            cancellation_type: handle.cancellation_type(),
            system_reboot_state: handle.system_reboot_state(),
            agent_restart_state: handle.agent_restart_state(),
            results: handle.results().clone(),
            instruction: handle.instruction().raw().to_string(),
            saved_at: Utc::now(),
        }
    }

    /// True when the workflow was interrupted before reaching an end state.
    pub fn is_resumable(&self) -> bool {
        !self.state.is_terminal()
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        if snapshot.version != CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
