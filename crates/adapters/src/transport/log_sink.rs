// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report sink that writes documents to the log.

use super::{ReportCompletion, ReportSink, TransportError};
use async_trait::async_trait;

/// Logs each document and acknowledges it immediately.
///
/// Stands in for a cloud connection when running the agent locally.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReportSink;

impl LogReportSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportSink for LogReportSink {
    async fn send(
        &self,
        payload: Vec<u8>,
        completion: ReportCompletion,
    ) -> Result<(), TransportError> {
        let document = String::from_utf8_lossy(&payload);
        tracing::info!(
            workflow_id = %completion.workflow_id(),
            seq = completion.seq(),
            %document,
            "reported",
        );
        completion.complete(true);
        Ok(())
    }
}
