// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ota_core::CancellationType;

fn download_calls(ctx: &TestContext) -> Vec<String> {
    ctx.content
        .calls()
        .into_iter()
        .filter(|c| c.op == ContentOp::Download)
        .filter_map(|c| c.workflow_id.map(|id| id.to_string()))
        .collect()
}

#[tokio::test]
async fn cancel_during_download_reports_cancelled_failure_and_tears_down() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;

    ctx.deliver(&cancel_instruction(BUNDLE_WORKFLOW_ID)).await;
    ctx.settle().await;

    assert_eq!(
        ctx.last_reported(),
        Some((UpdateState::Failed, code::FAILURE_CANCELLED))
    );
    assert!(ctx.content.ops().ends_with(&[ContentOp::SandboxDestroy, ContentOp::Idle]));
    assert!(ctx.runtime.live().is_none());
    assert!(ctx.snapshot().is_none());
}

#[tokio::test]
async fn cancel_is_recorded_on_the_live_handle_while_step_runs() {
    let mut ctx = setup();
    ctx.content.block(ContentOp::Download);
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    // The worker's completion stays queued until the next settle.
    ctx.runtime
        .handle_event(Event::InstructionReceived {
            payload: cancel_instruction(BUNDLE_WORKFLOW_ID),
        })
        .await
        .unwrap();
    let live = ctx.runtime.live().unwrap();
    assert_eq!(live.handle().cancellation_type(), CancellationType::Normal);
    assert!(live.handle().operation_in_progress());
}

#[tokio::test]
async fn cancel_with_nothing_live_is_ignored() {
    let mut ctx = setup();
    ctx.deliver(&cancel_instruction(BUNDLE_WORKFLOW_ID)).await;
    ctx.settle().await;

    assert!(ctx.sink.sent().is_empty());
    assert!(ctx.content.ops().is_empty());
}

#[tokio::test]
async fn cancel_naming_another_workflow_still_cancels_the_live_one() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;

    ctx.deliver(&cancel_instruction("someone-else")).await;
    assert_eq!(
        ctx.runtime.live().unwrap().handle().cancellation_type(),
        CancellationType::Normal
    );

    ctx.content.release(ContentOp::Download);
    ctx.settle().await;

    assert!(ctx.runtime.live().is_none());
    assert_eq!(
        ctx.last_reported(),
        Some((UpdateState::Failed, code::FAILURE_CANCELLED))
    );
}

#[tokio::test]
async fn cancel_of_failed_workflow_finishes_immediately() {
    let mut ctx = setup();
    ctx.content
        .push_result(ContentOp::Download, UpdateResult::failure(erc::NO_MEMORY));
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;
    assert_eq!(ctx.last_reported(), Some((UpdateState::Failed, code::FAILURE)));

    ctx.deliver(&cancel_instruction(BUNDLE_WORKFLOW_ID)).await;
    ctx.settle().await;

    assert_eq!(
        ctx.last_reported(),
        Some((UpdateState::Failed, code::FAILURE_CANCELLED))
    );
    assert!(ctx.runtime.live().is_none());
}

#[tokio::test]
async fn replacement_hands_over_without_reporting_the_old_workflow() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, "wf-a").await;
    let reports_before = ctx.sink.sent().len();

    ctx.deliver(&InstructionBuilder::new("wf-b").build()).await;
    ctx.settle().await;

    let live = ctx.runtime.live().unwrap();
    assert_eq!(live.workflow_id().as_str(), "wf-b");
    assert_eq!(live.handle().state(), UpdateState::DownloadStarted);
    assert_eq!(download_calls(&ctx), vec!["wf-a", "wf-b"]);

    // Only wf-b's DownloadStarted went out after the handover.
    let after: Vec<_> = ctx.reported().split_off(reports_before);
    assert_eq!(
        after,
        vec![(UpdateState::DownloadStarted, code::DOWNLOAD_IN_PROGRESS)]
    );
    let idle_calls: Vec<_> = ctx
        .content
        .calls()
        .into_iter()
        .filter(|c| c.op == ContentOp::Idle)
        .collect();
    assert_eq!(idle_calls.len(), 1);
    assert_eq!(idle_calls[0].workflow_id, Some(WorkflowId::new("wf-a")));
}

#[tokio::test]
async fn newest_pending_instruction_wins() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, "wf-a").await;

    // Both arrive before wf-a's worker yields.
    ctx.runtime
        .handle_event(Event::InstructionReceived {
            payload: InstructionBuilder::new("wf-b").build(),
        })
        .await
        .unwrap();
    ctx.runtime
        .handle_event(Event::InstructionReceived {
            payload: InstructionBuilder::new("wf-c").build(),
        })
        .await
        .unwrap();
    assert_eq!(ctx.runtime.pending().unwrap().workflow_id().as_str(), "wf-c");
    ctx.settle().await;

    assert_eq!(download_calls(&ctx), vec!["wf-a", "wf-c"]);
    assert!(ctx.runtime.pending().is_none());
}

#[tokio::test]
async fn retry_token_restarts_failed_workflow_from_idle() {
    let mut ctx = setup();
    ctx.content
        .push_result(ContentOp::Download, UpdateResult::failure(erc::NO_MEMORY));
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    ctx.deliver(
        &InstructionBuilder::new(BUNDLE_WORKFLOW_ID)
            .retry("2022-01-27T00:00:00Z")
            .build(),
    )
    .await;
    ctx.settle().await;

    assert_eq!(ctx.content.count(ContentOp::Download), 2);
    assert_eq!(ctx.content.count(ContentOp::SandboxCreate), 2);
    assert_eq!(ctx.last_reported(), Some((UpdateState::Idle, code::APPLY_SUCCESS)));
    assert!(ctx.runtime.live().is_none());
    // The failed attempt was never reported as cancelled.
    assert!(!ctx
        .reported()
        .contains(&(UpdateState::Failed, code::FAILURE_CANCELLED)));
}

#[tokio::test]
async fn retry_during_running_step_waits_for_yield() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    let first_generation = ctx.runtime.live().unwrap().generation();

    ctx.deliver(
        &InstructionBuilder::new(BUNDLE_WORKFLOW_ID)
            .retry("2022-01-28T00:00:00Z")
            .build(),
    )
    .await;
    ctx.settle().await;

    let live = ctx.runtime.live().unwrap();
    assert_eq!(live.workflow_id(), &bundle_id());
    assert!(live.generation() > first_generation);
    assert_eq!(live.handle().retry_token(), Some("2022-01-28T00:00:00Z"));
    assert_eq!(ctx.content.count(ContentOp::Download), 2);
}
