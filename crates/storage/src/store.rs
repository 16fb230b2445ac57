// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence store for the single live workflow.

use crate::snapshot::{SnapshotError, WorkflowSnapshot};
use crate::writer::{FsSnapshotWriter, SnapshotWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Location of the snapshot file under a state directory.
pub fn snapshot_path(state_dir: &Path) -> PathBuf {
    state_dir.join("workflow").join("snapshot.json")
}

/// Owns the on-disk snapshot of the live workflow.
///
/// Only the workflow runtime writes it, so there is a single writer by
/// construction.
pub struct PersistenceStore<W: SnapshotWriter = FsSnapshotWriter> {
    path: PathBuf,
    writer: W,
    startup_taken: bool,
}

impl PersistenceStore<FsSnapshotWriter> {
    pub fn open(state_dir: &Path) -> Self {
        Self::with_writer(snapshot_path(state_dir), FsSnapshotWriter)
    }
}

impl<W: SnapshotWriter> PersistenceStore<W> {
    pub fn with_writer(path: PathBuf, writer: W) -> Self {
        Self {
            path,
            writer,
            startup_taken: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the snapshot durably: temp file, fsync, rename, directory fsync.
    ///
    /// Returns only after the snapshot would survive an immediate power loss.
    pub fn save(&self, snapshot: &WorkflowSnapshot) -> Result<(), SnapshotError> {
        let data = serde_json::to_vec(snapshot)?;
        let tmp_path = self.path.with_extension("tmp");
        self.writer.write_tmp(&tmp_path, &data)?;
        self.writer.fsync_file(&tmp_path)?;
        self.writer.rename(&tmp_path, &self.path)?;
        if let Some(parent) = self.path.parent() {
            self.writer.fsync_dir(parent)?;
        }
        debug!(
            workflow_id = %snapshot.workflow_id,
            state = %snapshot.state,
            bytes = data.len(),
            "snapshot saved",
        );
        Ok(())
    }

    /// Load the snapshot if one exists.
    ///
    /// Returns `Ok(None)` if the file doesn't exist or is corrupt. Corrupt
    /// snapshots are moved to a `.bak` file so the agent starts clean.
    pub fn load(&self) -> Result<Option<WorkflowSnapshot>, SnapshotError> {
        let Some(bytes) = self.writer.read(&self.path)? else {
            return Ok(None);
        };
        match WorkflowSnapshot::from_slice(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let bak_path = self.writer.quarantine(&self.path)?;
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    bak = %bak_path.display(),
                    "Corrupt workflow snapshot, moving to .bak and starting fresh",
                );
                Ok(None)
            }
        }
    }

    /// Load the snapshot on the first call only; later calls yield `None`.
    pub fn take_startup_snapshot(&mut self) -> Result<Option<WorkflowSnapshot>, SnapshotError> {
        if self.startup_taken {
            return Ok(None);
        }
        self.startup_taken = true;
        self.load()
    }

    /// Remove the snapshot once its workflow is torn down.
    pub fn clear(&self) -> Result<(), SnapshotError> {
        if self.writer.remove(&self.path)? {
            if let Some(parent) = self.path.parent() {
                self.writer.fsync_dir(parent)?;
            }
            debug!(path = %self.path.display(), "snapshot cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
