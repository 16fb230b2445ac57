// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report transport seam.
//!
//! The sink accepts or rejects a payload synchronously; accepted payloads
//! are acknowledged later through a [`ReportCompletion`], possibly from a
//! different task.

mod log_sink;

pub use log_sink::LogReportSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeReportSink, SentReport, SinkMode};

use async_trait::async_trait;
use ota_core::WorkflowId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from report sends
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("report rejected: {0}")]
    Rejected(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Acknowledgement of one send, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportAck {
    pub workflow_id: WorkflowId,
    pub seq: u64,
    pub accepted: bool,
}

/// Completion handle for one accepted send.
///
/// Resolves exactly once: either through [`complete`](Self::complete) or,
/// if dropped unresolved, as a rejection.
#[derive(Debug)]
pub struct ReportCompletion {
    workflow_id: WorkflowId,
    seq: u64,
    tx: Option<mpsc::UnboundedSender<ReportAck>>,
}

impl ReportCompletion {
    pub fn new(workflow_id: WorkflowId, seq: u64, tx: mpsc::UnboundedSender<ReportAck>) -> Self {
        Self {
            workflow_id,
            seq,
            tx: Some(tx),
        }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn complete(mut self, accepted: bool) {
        self.resolve(accepted);
    }

    fn resolve(&mut self, accepted: bool) {
        if let Some(tx) = self.tx.take() {
            // The runtime may already be gone at shutdown.
            let _ = tx.send(ReportAck {
                workflow_id: self.workflow_id.clone(),
                seq: self.seq,
                accepted,
            });
        }
    }
}

impl Drop for ReportCompletion {
    fn drop(&mut self) {
        self.resolve(false);
    }
}

/// Adapter for delivering reported documents to the cloud
#[async_trait]
pub trait ReportSink: Clone + Send + Sync + 'static {
    /// Hand a serialized document to the transport.
    ///
    /// `Ok` means the payload was accepted for delivery and `completion`
    /// will fire once delivery is confirmed or fails.
    async fn send(&self, payload: Vec<u8>, completion: ReportCompletion)
        -> Result<(), TransportError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
