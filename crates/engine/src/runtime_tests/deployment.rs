// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn deployment_runs_every_phase_then_reports_idle() {
    let mut ctx = setup();
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(
        ctx.content.ops(),
        vec![
            ContentOp::IsInstalled,
            ContentOp::SandboxCreate,
            ContentOp::Download,
            ContentOp::Install,
            ContentOp::Apply,
            ContentOp::SandboxDestroy,
            ContentOp::Idle,
        ]
    );
    assert_eq!(ctx.reported(), full_deployment_reports());
    assert!(ctx.runtime.live().is_none());
    assert!(ctx.snapshot().is_none());
}

#[tokio::test]
async fn idle_report_carries_installed_update_id() {
    let mut ctx = setup();
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    let last = ctx.sink.last().unwrap().json();
    assert_eq!(
        last["deviceUpdate"]["agent"]["installedUpdateId"],
        r#"{"provider":"Microsoft","name":"adu","version":"1.2.3.4"}"#
    );
    assert_eq!(last["deviceUpdate"]["agent"]["workflow"]["id"], BUNDLE_WORKFLOW_ID);
}

#[tokio::test]
async fn installed_update_skips_straight_to_idle() {
    let mut ctx = setup();
    ctx.content.set_installed();
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.content.ops(), vec![ContentOp::IsInstalled, ContentOp::Idle]);
    assert_eq!(ctx.reported(), vec![(UpdateState::Idle, code::APPLY_SUCCESS)]);
}

#[tokio::test]
async fn failed_installed_check_still_deploys() {
    let mut ctx = setup();
    ctx.content
        .push_result(ContentOp::IsInstalled, UpdateResult::failure(erc::NO_MEMORY));
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.content.count(ContentOp::Apply), 1);
    assert_eq!(ctx.last_reported(), Some((UpdateState::Idle, code::APPLY_SUCCESS)));
}

#[tokio::test]
async fn legacy_actions_stop_at_their_phase_and_continue() {
    let mut ctx = setup();
    ctx.deliver(&bundle_instruction(UpdateAction::Download)).await;
    ctx.settle().await;
    assert_eq!(
        ctx.runtime.live().unwrap().handle().state(),
        UpdateState::DownloadSucceeded
    );
    assert_eq!(ctx.content.ops(), vec![ContentOp::SandboxCreate, ContentOp::Download]);

    ctx.deliver(&bundle_instruction(UpdateAction::Install)).await;
    ctx.settle().await;
    assert_eq!(
        ctx.runtime.live().unwrap().handle().state(),
        UpdateState::InstallSucceeded
    );
    assert_eq!(ctx.content.count(ContentOp::Download), 1);
    assert_eq!(ctx.content.count(ContentOp::SandboxCreate), 1);

    ctx.deliver(&bundle_instruction(UpdateAction::Apply)).await;
    ctx.settle().await;
    assert!(ctx.runtime.live().is_none());
    assert_eq!(ctx.reported(), full_deployment_reports());
}

#[tokio::test]
async fn phase_failure_halts_and_keeps_handle_live() {
    let mut ctx = setup();
    ctx.content.push_result(
        ContentOp::Install,
        UpdateResult::failure(erc::NOT_PERMITTED).with_details("read-only rootfs"),
    );
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.content.count(ContentOp::Apply), 0);
    assert_eq!(ctx.last_reported(), Some((UpdateState::Failed, code::FAILURE)));
    assert_eq!(ctx.last_extended_code(), i64::from(erc::NOT_PERMITTED));
    let last = ctx.sink.last().unwrap().json();
    assert_eq!(
        last["deviceUpdate"]["agent"]["lastInstallResult"]["updateInstallResult"]["resultDetails"],
        "read-only rootfs"
    );

    let live = ctx.runtime.live().unwrap();
    assert_eq!(live.handle().state(), UpdateState::Failed);
    assert!(!live.handle().operation_in_progress());
    assert_eq!(ctx.snapshot().unwrap().state, UpdateState::Failed);
}

#[tokio::test]
async fn failed_component_fails_the_phase() {
    let mut ctx = setup();
    ctx.content.add_component(
        ContentOp::Install,
        "root",
        "root/0",
        UpdateState::Failed,
        UpdateResult::failure(erc::COMPONENT_FAILED),
    );
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.last_reported(), Some((UpdateState::Failed, code::FAILURE)));
    assert_eq!(ctx.last_extended_code(), i64::from(erc::COMPONENT_FAILED));
    assert_eq!(ctx.content.count(ContentOp::Apply), 0);
}

#[tokio::test]
async fn successful_components_are_merged_into_tree() {
    let mut ctx = setup();
    ctx.content.block(ContentOp::Apply);
    ctx.content.add_component(
        ContentOp::Install,
        "root",
        "root/0",
        UpdateState::InstallSucceeded,
        UpdateResult::new(code::INSTALL_SUCCESS),
    );
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    let live = ctx.runtime.live().unwrap();
    assert_eq!(live.handle().results().children("root"), vec!["root/0"]);
    assert_eq!(ctx.snapshot().unwrap().results.children("root"), vec!["root/0"]);
}

#[tokio::test]
async fn component_outside_its_parent_fails_the_phase() {
    let mut ctx = setup();
    ctx.content.add_component(
        ContentOp::Download,
        "root",
        "root/0/deep",
        UpdateState::DownloadSucceeded,
        UpdateResult::new(code::DOWNLOAD_SUCCESS),
    );
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.last_extended_code(), i64::from(erc::INVALID_COMPONENT_PATH));
    assert_eq!(ctx.content.count(ContentOp::Install), 0);
}

#[tokio::test]
async fn sandbox_failure_fails_before_download() {
    let mut ctx = setup();
    ctx.content
        .push_result(ContentOp::SandboxCreate, UpdateResult::failure(erc::NO_MEMORY));
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.content.count(ContentOp::Download), 0);
    assert_eq!(ctx.last_extended_code(), i64::from(erc::SANDBOX_CREATE_FAILED));
}

#[tokio::test]
async fn malformed_instruction_creates_nothing_and_reports_nothing() {
    let mut ctx = setup();
    let result = ctx
        .runtime
        .handle_event(Event::InstructionReceived {
            payload: "{not json".to_string(),
        })
        .await;

    assert!(matches!(result, Err(crate::EngineError::MalformedInstruction(_))));
    ctx.settle().await;
    assert!(ctx.runtime.live().is_none());
    assert!(ctx.sink.sent().is_empty());
    assert!(ctx.content.ops().is_empty());
}

#[tokio::test]
async fn repeated_instruction_while_running_is_ignored() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    let reports_before = ctx.sink.sent().len();

    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert_eq!(ctx.content.count(ContentOp::Download), 1);
    assert_eq!(ctx.sink.sent().len(), reports_before);
    assert!(ctx.runtime.pending().is_none());
}

#[tokio::test]
async fn completion_from_an_earlier_generation_is_dropped() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    let generation = ctx.runtime.live().unwrap().generation();

    ctx.runtime
        .handle_event(Event::StepCompleted {
            workflow_id: bundle_id(),
            generation: generation + 7,
            step: ota_core::Step::Phase(ota_core::Phase::Download),
            outcome: ota_core::StepOutcome::new(UpdateResult::new(code::DOWNLOAD_SUCCESS)),
        })
        .await
        .unwrap();

    let live = ctx.runtime.live().unwrap();
    assert_eq!(live.handle().state(), UpdateState::DownloadStarted);
    assert!(live.handle().operation_in_progress());
}
