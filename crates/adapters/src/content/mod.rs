// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content handler seam: the phase callbacks the workflow runtime drives.

mod context;
mod progress;
mod simulator;

pub use context::{CancelSignal, WorkflowContext};
pub use progress::{DownloadProgress, DownloadState, LogProgressSink, ProgressSink};
pub use simulator::{SimulatorContentHandler, SimulatorScript};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContentCall, ContentOp, FakeContentHandler};
#[cfg(any(test, feature = "test-support"))]
pub use progress::CollectingProgressSink;

use async_trait::async_trait;
use ota_core::{UpdateResult, WorkflowId};

/// Capability set a content handler provides to the workflow runtime.
///
/// Phase methods run on a worker task. They must poll
/// [`WorkflowContext::is_cancelled`] (or await [`WorkflowContext::cancelled`])
/// at safe points and return [`UpdateResult::cancelled`] promptly once a
/// cancellation is requested.
#[async_trait]
pub trait ContentHandler: Clone + Send + Sync + 'static {
    /// Whether the deployment's installed criteria are already satisfied.
    ///
    /// Returns `IsInstalled_Installed` or `IsInstalled_NotInstalled`, or a
    /// failure if the check itself failed.
    async fn is_installed(&self, ctx: &WorkflowContext) -> UpdateResult;

    /// Prepare the work folder before the first phase of a workflow.
    async fn sandbox_create(&self, ctx: &WorkflowContext) -> UpdateResult;

    /// Remove the work folder at teardown.
    async fn sandbox_destroy(&self, ctx: &WorkflowContext);

    async fn download(&self, ctx: &WorkflowContext) -> UpdateResult;

    async fn install(&self, ctx: &WorkflowContext) -> UpdateResult;

    async fn apply(&self, ctx: &WorkflowContext) -> UpdateResult;

    /// Called when the agent becomes idle: at startup without a workflow to
    /// resume, and after each workflow is torn down.
    async fn idle(&self, workflow_id: Option<&WorkflowId>);
}
