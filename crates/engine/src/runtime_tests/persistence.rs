// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn snapshot_is_written_before_phase_starts() {
    let mut ctx = setup();
    let payload = bundle_instruction(UpdateAction::ProcessDeployment);
    ctx.content.block(ContentOp::Download);
    ctx.deliver(&payload).await;
    ctx.settle().await;

    let snapshot = ctx.snapshot().unwrap();
    assert_eq!(snapshot.workflow_id, bundle_id());
    assert_eq!(snapshot.state, UpdateState::DownloadStarted);
    assert_eq!(snapshot.instruction, payload);
    assert!(snapshot.is_resumable());
}

#[tokio::test]
async fn unwritable_snapshot_fails_instead_of_starting_phase() {
    let mut ctx = setup();
    ctx.writer.fail_all_writes();
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.content.ops(), vec![ContentOp::IsInstalled]);
    assert_eq!(ctx.reported(), vec![(UpdateState::Failed, code::FAILURE)]);
    assert_eq!(ctx.last_extended_code(), i64::from(erc::PERSISTENCE_WRITE_FAILED));
    assert_eq!(
        ctx.runtime.live().unwrap().handle().state(),
        UpdateState::Failed
    );
}

#[tokio::test]
async fn unwritable_success_is_not_advanced_past() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;

    ctx.writer.fail_all_writes();
    ctx.content.release(ContentOp::Download);
    ctx.settle().await;

    assert_eq!(ctx.content.count(ContentOp::Install), 0);
    assert!(!ctx
        .reported()
        .iter()
        .any(|(state, _)| *state == UpdateState::DownloadSucceeded));
    assert_eq!(ctx.last_extended_code(), i64::from(erc::PERSISTENCE_WRITE_FAILED));
    // The last durable record still says the download was only started.
    assert_eq!(ctx.snapshot().unwrap().state, UpdateState::DownloadStarted);
}

#[tokio::test]
async fn transient_write_failures_are_retried() {
    let mut ctx = setup();
    ctx.writer.fail_next_writes(2);
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.reported(), full_deployment_reports());
}

#[tokio::test]
async fn single_attempt_policy_gives_up_on_first_failure() {
    let mut config = test_config();
    config.persistence_attempts = 1;
    let mut ctx = setup_with_config(config);
    ctx.writer.fail_next_writes(1);
    ctx.deliver(&bundle_instruction(UpdateAction::Download)).await;
    ctx.settle().await;

    assert_eq!(ctx.content.count(ContentOp::Download), 0);
    assert_eq!(ctx.last_extended_code(), i64::from(erc::PERSISTENCE_WRITE_FAILED));
}

#[tokio::test]
async fn snapshot_is_cleared_at_teardown() {
    let mut ctx = setup();
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert!(ctx.writer.committed_writes() > 0);
    assert!(ctx.snapshot().is_none());
}
