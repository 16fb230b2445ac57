// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Persistence store for the OTA workflow snapshot

mod snapshot;
mod store;
mod writer;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use snapshot::{SnapshotError, WorkflowSnapshot, CURRENT_SNAPSHOT_VERSION};
pub use store::{snapshot_path, PersistenceStore};
pub use writer::{FsSnapshotWriter, SnapshotWriter};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSnapshotWriter, SnapshotIo};
