// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::setup_on_disk;
use ota_core::{AgentRestartState, CancellationType, SystemRebootState};

/// Run a deployment that asks for a reboot after install.
async fn suspended_for_reboot() -> TestContext {
    let mut ctx = setup();
    ctx.content.request_reboot_after(ContentOp::Install);
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;
    ctx
}

#[tokio::test]
async fn reboot_request_suspends_after_reporting() {
    let ctx = suspended_for_reboot().await;

    assert_eq!(ctx.device.calls(), vec![DeviceCall::Reboot]);
    assert_eq!(ctx.content.count(ContentOp::Apply), 0);
    assert_eq!(
        ctx.last_reported(),
        Some((UpdateState::InstallSucceeded, code::INSTALL_SUCCESS))
    );
    let snapshot = ctx.snapshot().unwrap();
    assert_eq!(snapshot.state, UpdateState::InstallSucceeded);
    assert_eq!(snapshot.system_reboot_state, SystemRebootState::InProgress);
}

#[tokio::test]
async fn reboot_required_result_code_also_suspends() {
    let mut ctx = setup();
    ctx.content.push_result(
        ContentOp::Install,
        UpdateResult::new(code::INSTALL_REQUIRED_REBOOT),
    );
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.device.calls(), vec![DeviceCall::Reboot]);
    assert_eq!(ctx.content.count(ContentOp::Apply), 0);
}

#[tokio::test]
async fn startup_after_reboot_resumes_with_apply() {
    let before = suspended_for_reboot().await;
    let mut after = before.restart();
    after.runtime.startup().await.unwrap();
    after.settle().await;

    assert_eq!(
        after.content.ops(),
        vec![
            ContentOp::SandboxCreate,
            ContentOp::Apply,
            ContentOp::SandboxDestroy,
            ContentOp::Idle,
        ]
    );
    assert_eq!(
        after.reported(),
        vec![
            (UpdateState::ApplyStarted, code::APPLY_IN_PROGRESS),
            (UpdateState::Idle, code::APPLY_SUCCESS),
        ]
    );
    assert!(after.snapshot().is_none());
}

#[tokio::test]
async fn resumed_workflow_drops_reboot_marker() {
    let before = suspended_for_reboot().await;
    let mut after = before.restart();
    after.content.block(ContentOp::Apply);
    after.runtime.startup().await.unwrap();
    after.settle().await;

    let snapshot = after.snapshot().unwrap();
    assert_eq!(snapshot.state, UpdateState::ApplyStarted);
    assert_eq!(snapshot.system_reboot_state, SystemRebootState::None);
    assert!(after.device.calls().is_empty());
}

#[tokio::test]
async fn agent_restart_after_download_resumes_at_install() {
    let mut ctx = setup();
    ctx.content.request_restart_after(ContentOp::Download);
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;
    assert_eq!(ctx.device.calls(), vec![DeviceCall::RestartAgent]);
    let snapshot = ctx.snapshot().unwrap();
    assert_eq!(snapshot.state, UpdateState::DownloadSucceeded);
    assert_eq!(snapshot.agent_restart_state, AgentRestartState::InProgress);

    let mut after = ctx.restart();
    after.runtime.startup().await.unwrap();
    after.settle().await;

    assert_eq!(after.content.count(ContentOp::Download), 0);
    assert_eq!(
        after.reported().first(),
        Some(&(UpdateState::InstallStarted, code::INSTALL_IN_PROGRESS))
    );
    assert_eq!(after.last_reported(), Some((UpdateState::Idle, code::APPLY_SUCCESS)));
}

#[tokio::test]
async fn interrupted_phase_is_rerun() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;

    let mut after = ctx.restart();
    after.runtime.startup().await.unwrap();
    after.settle().await;

    assert_eq!(after.content.count(ContentOp::Download), 1);
    assert_eq!(after.last_reported(), Some((UpdateState::Idle, code::APPLY_SUCCESS)));
}

#[tokio::test]
async fn cancel_recorded_before_shutdown_finishes_on_startup() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    ctx.deliver(&cancel_instruction(BUNDLE_WORKFLOW_ID)).await;

    let snapshot = ctx.snapshot().unwrap();
    assert_eq!(snapshot.state, UpdateState::DownloadStarted);
    assert_eq!(snapshot.cancellation_type, CancellationType::Normal);

    let mut after = ctx.restart();
    after.runtime.startup().await.unwrap();
    after.settle().await;

    assert_eq!(after.content.count(ContentOp::Download), 0);
    assert_eq!(
        after.reported(),
        vec![(UpdateState::Failed, code::FAILURE_CANCELLED)]
    );
    assert!(after.runtime.live().is_none());
    assert!(after.snapshot().is_none());
}

#[tokio::test]
async fn failing_device_control_fails_the_workflow() {
    let mut ctx = setup();
    ctx.device.set_fail(true);
    ctx.content.request_reboot_after(ContentOp::Install);
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.last_reported(), Some((UpdateState::Failed, code::FAILURE)));
    assert_eq!(ctx.last_extended_code(), i64::from(erc::DEVICE_CONTROL_FAILED));
    assert_eq!(
        ctx.runtime.live().unwrap().handle().state(),
        UpdateState::Failed
    );
}

#[tokio::test]
async fn startup_without_snapshot_goes_idle_once() {
    let mut ctx = setup();
    ctx.runtime.startup().await.unwrap();

    let calls = ctx.content.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].op, ContentOp::Idle);
    assert_eq!(calls[0].workflow_id, None);
    assert!(ctx.runtime.live().is_none());
}

#[tokio::test]
async fn failed_snapshot_is_cleared_at_startup() {
    let mut ctx = setup();
    ctx.content
        .push_result(ContentOp::Install, UpdateResult::failure(erc::NO_MEMORY));
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;
    assert_eq!(ctx.snapshot().unwrap().state, UpdateState::Failed);

    let mut after = ctx.restart();
    after.runtime.startup().await.unwrap();

    assert_eq!(after.content.ops(), vec![ContentOp::Idle]);
    assert!(after.snapshot().is_none());
    assert!(after.runtime.live().is_none());
}

#[tokio::test]
async fn corrupt_snapshot_is_quarantined_and_ignored() {
    let mut ctx = setup();
    ctx.writer.put(&ctx.snapshot_path(), b"{truncated");
    ctx.runtime.startup().await.unwrap();

    assert_eq!(ctx.content.ops(), vec![ContentOp::Idle]);
    assert!(ctx.snapshot().is_none());
    assert!(ctx
        .writer
        .contents(&ctx.snapshot_path().with_extension("bak"))
        .is_some());
}

#[tokio::test]
async fn snapshot_with_unreadable_instruction_starts_clean() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    let mut snapshot = ctx.snapshot().unwrap();
    snapshot.instruction = "not an instruction".to_string();
    ctx.writer
        .put(&ctx.snapshot_path(), &serde_json::to_vec(&snapshot).unwrap());

    let mut after = ctx.restart();
    after.runtime.startup().await.unwrap();

    assert_eq!(after.content.ops(), vec![ContentOp::Idle]);
    assert!(after.snapshot().is_none());
}

#[tokio::test]
async fn legacy_workflow_resumes_waiting_at_its_phase() {
    let mut ctx = setup();
    ctx.content.request_restart_after(ContentOp::Download);
    ctx.deliver(&bundle_instruction(UpdateAction::Download)).await;
    ctx.settle().await;

    let mut after = ctx.restart();
    after.runtime.startup().await.unwrap();
    after.settle().await;

    assert_eq!(after.content.count(ContentOp::Install), 0);
    assert_eq!(
        after.runtime.live().unwrap().handle().state(),
        UpdateState::DownloadSucceeded
    );
    assert_eq!(
        after.reported(),
        vec![(UpdateState::DownloadSucceeded, code::DOWNLOAD_SUCCESS)]
    );
}

#[tokio::test]
async fn snapshot_on_disk_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = setup_on_disk(dir.path());
    ctx.content.request_reboot_after(ContentOp::Install);
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;
    assert!(ctx.snapshot_path().exists());

    let mut after = ctx.restart();
    after.runtime.startup().await.unwrap();
    after.settle().await;

    assert_eq!(after.content.count(ContentOp::Download), 0);
    assert_eq!(after.content.count(ContentOp::Install), 0);
    assert_eq!(after.last_reported(), Some((UpdateState::Idle, code::APPLY_SUCCESS)));
    assert!(!after.snapshot_path().exists());
}
