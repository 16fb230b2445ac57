// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake content handler for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ContentHandler, WorkflowContext};
use async_trait::async_trait;
use ota_core::{code, Phase, UpdateResult, UpdateState, WorkflowId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

/// Which callback was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentOp {
    IsInstalled,
    SandboxCreate,
    SandboxDestroy,
    Download,
    Install,
    Apply,
    Idle,
}

impl From<Phase> for ContentOp {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Download => ContentOp::Download,
            Phase::Install => ContentOp::Install,
            Phase::Apply => ContentOp::Apply,
        }
    }
}

/// Recorded callback invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCall {
    pub op: ContentOp,
    pub workflow_id: Option<WorkflowId>,
}

#[derive(Default)]
struct FakeContentState {
    calls: Vec<ContentCall>,
    scripted: HashMap<ContentOp, VecDeque<UpdateResult>>,
    blocked: HashSet<ContentOp>,
    components: HashMap<ContentOp, Vec<(String, String, UpdateState, UpdateResult)>>,
    reboot_after: HashSet<ContentOp>,
    restart_after: HashSet<ContentOp>,
}

/// Fake content handler with scripted results and blockable phases.
///
/// Unscripted calls succeed with the phase's success code; `is_installed`
/// defaults to "not installed".
#[derive(Clone, Default)]
pub struct FakeContentHandler {
    inner: Arc<Mutex<FakeContentState>>,
    /// Signalled on every call and on `release`.
    changed: Arc<Notify>,
}

fn default_result(op: ContentOp) -> UpdateResult {
    let code = match op {
        ContentOp::IsInstalled => code::IS_INSTALLED_NOT_INSTALLED,
        ContentOp::Download => code::DOWNLOAD_SUCCESS,
        ContentOp::Install => code::INSTALL_SUCCESS,
        ContentOp::Apply => code::APPLY_SUCCESS,
        ContentOp::SandboxCreate | ContentOp::SandboxDestroy | ContentOp::Idle => code::SUCCESS,
    };
    UpdateResult::new(code)
}

impl FakeContentHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next call of `op`.
    pub fn push_result(&self, op: ContentOp, result: UpdateResult) {
        self.inner
            .lock()
            .scripted
            .entry(op)
            .or_default()
            .push_back(result);
    }

    pub fn set_installed(&self) {
        self.push_result(
            ContentOp::IsInstalled,
            UpdateResult::new(code::IS_INSTALLED_INSTALLED),
        );
    }

    /// Make `op` wait until cancelled (returning `Failure_Cancelled`) or released.
    pub fn block(&self, op: ContentOp) {
        self.inner.lock().blocked.insert(op);
    }

    /// Let a blocked `op` return its scripted result.
    pub fn release(&self, op: ContentOp) {
        self.inner.lock().blocked.remove(&op);
        self.changed.notify_waiters();
    }

    /// Record a component result each time `op` runs.
    pub fn add_component(
        &self,
        op: ContentOp,
        parent: &str,
        path: &str,
        state: UpdateState,
        result: UpdateResult,
    ) {
        self.inner.lock().components.entry(op).or_default().push((
            parent.to_string(),
            path.to_string(),
            state,
            result,
        ));
    }

    pub fn request_reboot_after(&self, op: ContentOp) {
        self.inner.lock().reboot_after.insert(op);
    }

    pub fn request_restart_after(&self, op: ContentOp) {
        self.inner.lock().restart_after.insert(op);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ContentCall> {
        self.inner.lock().calls.clone()
    }

    pub fn ops(&self) -> Vec<ContentOp> {
        self.inner.lock().calls.iter().map(|c| c.op).collect()
    }

    pub fn count(&self, op: ContentOp) -> usize {
        self.inner.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Wait until `op` has been called at least `n` times.
    pub async fn wait_for(&self, op: ContentOp, n: usize) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count(op) >= n {
                return;
            }
            notified.await;
        }
    }

    fn record(&self, op: ContentOp, workflow_id: Option<&WorkflowId>) {
        self.inner.lock().calls.push(ContentCall {
            op,
            workflow_id: workflow_id.cloned(),
        });
        self.changed.notify_waiters();
    }

    async fn run(&self, op: ContentOp, ctx: &WorkflowContext) -> UpdateResult {
        self.record(op, Some(ctx.workflow_id()));
        loop {
            let released = self.changed.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            if !self.inner.lock().blocked.contains(&op) {
                break;
            }
            if ctx.is_cancelled() {
                return UpdateResult::cancelled();
            }
            tokio::select! {
                _ = ctx.cancelled() => return UpdateResult::cancelled(),
                _ = &mut released => {}
            }
        }
        let mut state = self.inner.lock();
        for (parent, path, st, result) in state.components.get(&op).cloned().unwrap_or_default() {
            ctx.record_component(&parent, &path, st, result);
        }
        if state.reboot_after.contains(&op) {
            ctx.request_reboot();
        }
        if state.restart_after.contains(&op) {
            ctx.request_agent_restart();
        }
        state
            .scripted
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| default_result(op))
    }
}

#[async_trait]
impl ContentHandler for FakeContentHandler {
    async fn is_installed(&self, ctx: &WorkflowContext) -> UpdateResult {
        self.run(ContentOp::IsInstalled, ctx).await
    }

    async fn sandbox_create(&self, ctx: &WorkflowContext) -> UpdateResult {
        self.run(ContentOp::SandboxCreate, ctx).await
    }

    async fn sandbox_destroy(&self, ctx: &WorkflowContext) {
        self.record(ContentOp::SandboxDestroy, Some(ctx.workflow_id()));
    }

    async fn download(&self, ctx: &WorkflowContext) -> UpdateResult {
        self.run(ContentOp::Download, ctx).await
    }

    async fn install(&self, ctx: &WorkflowContext) -> UpdateResult {
        self.run(ContentOp::Install, ctx).await
    }

    async fn apply(&self, ctx: &WorkflowContext) -> UpdateResult {
        self.run(ContentOp::Apply, ctx).await
    }

    async fn idle(&self, workflow_id: Option<&WorkflowId>) {
        self.record(ContentOp::Idle, workflow_id);
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
