// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot I/O seam.
//!
//! Every file operation the store performs goes through [`SnapshotWriter`],
//! so tests can inject failures at each step of a durable write and check
//! that a workflow never advances past a state it could not record.

use crate::snapshot::rotate_bak_path;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub trait SnapshotWriter: Send + Sync + 'static {
    /// Write data to a temporary file, creating parent directories.
    fn write_tmp(&self, path: &Path, data: &[u8]) -> std::io::Result<()>;

    /// Fsync a file to ensure data is durable.
    fn fsync_file(&self, path: &Path) -> std::io::Result<()>;

    /// Atomically rename tmp file to final path.
    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Fsync directory to make a rename or removal durable.
    fn fsync_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Read a whole file; `None` if it does not exist.
    fn read(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>>;

    /// Remove a file; returns whether it existed.
    fn remove(&self, path: &Path) -> std::io::Result<bool>;

    /// Move an unreadable file aside and return where it went.
    fn quarantine(&self, path: &Path) -> std::io::Result<PathBuf>;
}

/// Production writer using real filesystem operations.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSnapshotWriter;

impl SnapshotWriter for FsSnapshotWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> std::io::Result<()> {
        File::open(path)?.sync_all()
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        fs::rename(from, to)
    }

    #[cfg(unix)]
    fn fsync_dir(&self, path: &Path) -> std::io::Result<()> {
        File::open(path)?.sync_all()
    }

    #[cfg(not(unix))]
    fn fsync_dir(&self, _path: &Path) -> std::io::Result<()> {
        Ok(())
    }

    fn read(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn remove(&self, path: &Path) -> std::io::Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn quarantine(&self, path: &Path) -> std::io::Result<PathBuf> {
        let bak = rotate_bak_path(path);
        fs::rename(path, &bak)?;
        Ok(bak)
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
