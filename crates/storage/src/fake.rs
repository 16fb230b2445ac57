// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory snapshot writer with fault injection
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::writer::SnapshotWriter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded I/O operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotIo {
    WriteTmp(PathBuf),
    FsyncFile(PathBuf),
    Rename(PathBuf, PathBuf),
    FsyncDir(PathBuf),
    Remove(PathBuf),
    Quarantine(PathBuf),
}

#[derive(Default)]
struct FakeWriterState {
    files: HashMap<PathBuf, Vec<u8>>,
    ops: Vec<SnapshotIo>,
    /// Remaining `write_tmp` calls that should fail.
    failing_writes: u32,
    fail_renames: bool,
}

/// Fake writer that keeps files in memory and records operations.
#[derive(Clone, Default)]
pub struct FakeSnapshotWriter {
    inner: Arc<Mutex<FakeWriterState>>,
}

fn injected(what: &str) -> Error {
    Error::new(ErrorKind::Other, format!("injected {what} failure"))
}

impl FakeSnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` temp-file writes.
    pub fn fail_next_writes(&self, n: u32) {
        self.inner.lock().failing_writes = n;
    }

    /// Fail every write until reset with `fail_next_writes(0)`.
    pub fn fail_all_writes(&self) {
        self.inner.lock().failing_writes = u32::MAX;
    }

    pub fn set_fail_renames(&self, fail: bool) {
        self.inner.lock().fail_renames = fail;
    }

    /// Seed a file, e.g. a corrupt snapshot.
    pub fn put(&self, path: &Path, data: &[u8]) {
        self.inner.lock().files.insert(path.to_owned(), data.to_vec());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.inner.lock().files.get(path).cloned()
    }

    pub fn ops(&self) -> Vec<SnapshotIo> {
        self.inner.lock().ops.clone()
    }

    /// Number of completed (renamed into place) snapshot writes.
    pub fn committed_writes(&self) -> usize {
        self.inner
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, SnapshotIo::Rename(..)))
            .count()
    }
}

impl SnapshotWriter for FakeSnapshotWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut state = self.inner.lock();
        if state.failing_writes > 0 {
            if state.failing_writes != u32::MAX {
                state.failing_writes -= 1;
            }
            return Err(injected("write"));
        }
        state.ops.push(SnapshotIo::WriteTmp(path.to_owned()));
        state.files.insert(path.to_owned(), data.to_vec());
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> std::io::Result<()> {
        self.inner
            .lock()
            .ops
            .push(SnapshotIo::FsyncFile(path.to_owned()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        let mut state = self.inner.lock();
        if state.fail_renames {
            return Err(injected("rename"));
        }
        let data = state
            .files
            .remove(from)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "rename source missing"))?;
        state.files.insert(to.to_owned(), data);
        state
            .ops
            .push(SnapshotIo::Rename(from.to_owned(), to.to_owned()));
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> std::io::Result<()> {
        self.inner
            .lock()
            .ops
            .push(SnapshotIo::FsyncDir(path.to_owned()));
        Ok(())
    }

    fn read(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().files.get(path).cloned())
    }

    fn remove(&self, path: &Path) -> std::io::Result<bool> {
        let mut state = self.inner.lock();
        state.ops.push(SnapshotIo::Remove(path.to_owned()));
        Ok(state.files.remove(path).is_some())
    }

    fn quarantine(&self, path: &Path) -> std::io::Result<PathBuf> {
        let mut state = self.inner.lock();
        let bak = path.with_extension("bak");
        if let Some(data) = state.files.remove(path) {
            state.files.insert(bak.clone(), data);
        }
        state.ops.push(SnapshotIo::Quarantine(path.to_owned()));
        Ok(bak)
    }
}
