// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::content::{CancelSignal, LogProgressSink};
use ota_core::{CancellationFlag, CancellationType, UpdateAction};
use std::path::PathBuf;
use std::time::Duration;

fn context() -> (Arc<WorkflowContext>, CancelSignal) {
    let signal = CancelSignal::new(Arc::new(CancellationFlag::new()));
    let ctx = WorkflowContext::new(
        WorkflowId::new("wf-fake"),
        UpdateAction::ProcessDeployment,
        None,
        PathBuf::from("/tmp/wf-fake"),
        signal.clone(),
        Arc::new(LogProgressSink),
    );
    (Arc::new(ctx), signal)
}

#[tokio::test]
async fn unscripted_calls_succeed_and_are_recorded() {
    let fake = FakeContentHandler::new();
    let (ctx, _) = context();

    assert_eq!(
        fake.is_installed(&ctx).await.result_code,
        code::IS_INSTALLED_NOT_INSTALLED
    );
    assert_eq!(fake.download(&ctx).await.result_code, code::DOWNLOAD_SUCCESS);
    fake.idle(None).await;

    let calls = fake.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].op, ContentOp::Download);
    assert_eq!(calls[1].workflow_id.as_ref().unwrap(), "wf-fake");
    assert_eq!(calls[2].workflow_id, None);
}

#[tokio::test]
async fn scripted_results_are_consumed_in_order() {
    let fake = FakeContentHandler::new();
    fake.push_result(ContentOp::Install, UpdateResult::failure(1));
    fake.push_result(ContentOp::Install, UpdateResult::failure(2));
    let (ctx, _) = context();

    assert_eq!(fake.install(&ctx).await.extended_result_code, 1);
    assert_eq!(fake.install(&ctx).await.extended_result_code, 2);
    assert!(fake.install(&ctx).await.is_success());
}

#[tokio::test]
async fn blocked_phase_returns_cancelled_when_cancelled() {
    let fake = FakeContentHandler::new();
    fake.block(ContentOp::Download);
    let (ctx, signal) = context();

    let task = {
        let fake = fake.clone();
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move { fake.download(&ctx).await })
    };
    fake.wait_for(ContentOp::Download, 1).await;
    signal.cancel(CancellationType::Normal);

    let result = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_cancelled());
}

#[tokio::test]
async fn blocked_phase_returns_result_when_released() {
    let fake = FakeContentHandler::new();
    fake.block(ContentOp::Apply);
    let (ctx, _) = context();

    let task = {
        let fake = fake.clone();
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move { fake.apply(&ctx).await })
    };
    fake.wait_for(ContentOp::Apply, 1).await;
    fake.release(ContentOp::Apply);

    let result = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.result_code, code::APPLY_SUCCESS);
}

#[tokio::test]
async fn components_and_reboot_requests_land_on_context() {
    let fake = FakeContentHandler::new();
    fake.add_component(
        ContentOp::Install,
        "root",
        "root/0",
        UpdateState::InstallSucceeded,
        UpdateResult::new(code::INSTALL_SUCCESS),
    );
    fake.request_reboot_after(ContentOp::Install);
    let (ctx, _) = context();

    let result = fake.install(&ctx).await;
    let outcome = ctx.finish_step(result);
    assert_eq!(outcome.components.len(), 1);
    assert!(outcome.wants_reboot());
}
