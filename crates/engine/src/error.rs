// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the workflow engine

use ota_adapters::TransportError;
use ota_core::{ParseError, WorkflowId};
use ota_storage::SnapshotError;
use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow {0} is already live")]
    Busy(WorkflowId),
    #[error(transparent)]
    MalformedInstruction(#[from] ParseError),
    #[error("persistence error: {0}")]
    Persistence(#[from] SnapshotError),
    #[error("report encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
