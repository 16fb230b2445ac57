// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::content::{ContentHandler, WorkflowContext};
use crate::device::{DeviceControl, DeviceControlError};
use crate::transport::{ReportCompletion, ReportSink, TransportError};
use async_trait::async_trait;
use ota_core::{UpdateResult, WorkflowId};
use std::future::Future;
use tracing::Instrument;

/// Wrapper that adds tracing to any ContentHandler
#[derive(Clone)]
pub struct TracedContent<H> {
    inner: H,
}

impl<H> TracedContent<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

/// Run one phase callback inside a span, logging its duration and result.
async fn traced_phase<F>(name: &'static str, workflow_id: &WorkflowId, call: F) -> UpdateResult
where
    F: Future<Output = UpdateResult>,
{
    async {
        tracing::info!("starting");
        let start = std::time::Instant::now();
        let result = call.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if result.is_success() {
            tracing::info!(elapsed_ms, result_code = result.result_code, "finished");
        } else if result.is_cancelled() {
            tracing::warn!(elapsed_ms, "cancelled");
        } else {
            tracing::error!(
                elapsed_ms,
                result_code = result.result_code,
                extended_result_code = format_args!("0x{:08x}", result.extended_result_code),
                details = %result.result_details,
                "failed",
            );
        }
        result
    }
    .instrument(tracing::info_span!("content", phase = name, %workflow_id))
    .await
}

#[async_trait]
impl<H: ContentHandler> ContentHandler for TracedContent<H> {
    async fn is_installed(&self, ctx: &WorkflowContext) -> UpdateResult {
        traced_phase("is_installed", ctx.workflow_id(), self.inner.is_installed(ctx)).await
    }

    async fn sandbox_create(&self, ctx: &WorkflowContext) -> UpdateResult {
        traced_phase("sandbox_create", ctx.workflow_id(), self.inner.sandbox_create(ctx)).await
    }

    async fn sandbox_destroy(&self, ctx: &WorkflowContext) {
        tracing::info_span!("content", phase = "sandbox_destroy", workflow_id = %ctx.workflow_id())
            .in_scope(|| tracing::debug!(dir = %ctx.work_dir().display(), "destroying"));
        self.inner.sandbox_destroy(ctx).await
    }

    async fn download(&self, ctx: &WorkflowContext) -> UpdateResult {
        traced_phase("download", ctx.workflow_id(), self.inner.download(ctx)).await
    }

    async fn install(&self, ctx: &WorkflowContext) -> UpdateResult {
        traced_phase("install", ctx.workflow_id(), self.inner.install(ctx)).await
    }

    async fn apply(&self, ctx: &WorkflowContext) -> UpdateResult {
        traced_phase("apply", ctx.workflow_id(), self.inner.apply(ctx)).await
    }

    async fn idle(&self, workflow_id: Option<&WorkflowId>) {
        tracing::debug!(workflow_id = ?workflow_id.map(WorkflowId::as_str), "content idle");
        self.inner.idle(workflow_id).await
    }
}

/// Wrapper that adds tracing to any ReportSink
#[derive(Clone)]
pub struct TracedSink<T> {
    inner: T,
}

impl<T> TracedSink<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: ReportSink> ReportSink for TracedSink<T> {
    async fn send(
        &self,
        payload: Vec<u8>,
        completion: ReportCompletion,
    ) -> Result<(), TransportError> {
        let span = tracing::info_span!(
            "report.send",
            workflow_id = %completion.workflow_id(),
            seq = completion.seq(),
        );
        async {
            tracing::debug!(bytes = payload.len(), "sending");
            let result = self.inner.send(payload, completion).await;
            if let Err(ref e) = result {
                tracing::warn!(error = %e, "send rejected");
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any DeviceControl
#[derive(Clone)]
pub struct TracedDevice<D> {
    inner: D,
}

impl<D> TracedDevice<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<D: DeviceControl> DeviceControl for TracedDevice<D> {
    async fn reboot(&self) -> Result<(), DeviceControlError> {
        let result = self.inner.reboot().await;
        tracing::info_span!("device.reboot").in_scope(|| match &result {
            Ok(()) => tracing::info!("reboot requested"),
            Err(e) => tracing::error!(error = %e, "reboot failed"),
        });
        result
    }

    async fn restart_agent(&self) -> Result<(), DeviceControlError> {
        let result = self.inner.restart_agent().await;
        tracing::info_span!("device.restart_agent").in_scope(|| match &result {
            Ok(()) => tracing::info!("agent restart requested"),
            Err(e) => tracing::error!(error = %e, "agent restart failed"),
        });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
