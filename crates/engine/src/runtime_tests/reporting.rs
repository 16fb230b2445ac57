// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ReportShape;

#[tokio::test]
async fn acknowledged_report_updates_last_reported_state() {
    let mut ctx = setup();
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;

    assert_eq!(
        ctx.runtime.last_reported_state(&bundle_id()),
        Some(UpdateState::DownloadStarted)
    );
    let root = ctx.runtime.live().unwrap().handle().results().root();
    assert_eq!(root.last_reported_state(), UpdateState::DownloadStarted);
}

#[tokio::test]
async fn rejected_report_is_resent_on_retry_tick() {
    let mut ctx = setup();
    ctx.sink.set_mode(SinkMode::RejectAsync);
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    assert_eq!(ctx.sink.sent().len(), 1);
    assert_eq!(ctx.runtime.last_reported_state(&bundle_id()), None);

    ctx.sink.set_mode(SinkMode::AutoAck);
    ctx.runtime.handle_event(Event::ReportRetryTick).await.unwrap();
    ctx.settle().await;

    let texts = ctx.sink.sent_texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], texts[1]);
    assert_eq!(
        ctx.runtime.last_reported_state(&bundle_id()),
        Some(UpdateState::DownloadStarted)
    );
}

#[tokio::test]
async fn refused_report_goes_out_before_the_next_one() {
    let mut ctx = setup();
    ctx.sink.set_mode(SinkMode::RejectSync);
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;

    ctx.sink.set_mode(SinkMode::AutoAck);
    ctx.content.release(ContentOp::Download);
    ctx.settle().await;

    let reported = ctx.reported();
    assert_eq!(reported[0].0, UpdateState::DownloadStarted);
    assert_eq!(reported[1].0, UpdateState::DownloadStarted);
    assert_eq!(
        reported.last(),
        Some(&(UpdateState::Idle, code::APPLY_SUCCESS))
    );
}

#[tokio::test]
async fn newer_report_waits_for_in_flight_one() {
    let mut ctx = setup();
    ctx.sink.set_mode(SinkMode::Manual);
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    ctx.content.block(ContentOp::Install);
    ctx.content.release(ContentOp::Download);
    ctx.settle().await;

    // DownloadSucceeded and InstallStarted queued behind the held send;
    // only the newest survives.
    assert_eq!(ctx.sink.sent().len(), 1);

    assert!(ctx.sink.complete_next(true));
    ctx.settle().await;
    assert_eq!(
        ctx.reported(),
        vec![
            (UpdateState::DownloadStarted, code::DOWNLOAD_IN_PROGRESS),
            (UpdateState::InstallStarted, code::INSTALL_IN_PROGRESS),
        ]
    );
    assert_eq!(
        ctx.runtime.last_reported_state(&bundle_id()),
        Some(UpdateState::DownloadStarted)
    );
}

#[tokio::test]
async fn ack_arriving_after_the_next_phase_began_is_recorded_on_root() {
    let mut ctx = setup();
    ctx.sink.set_mode(SinkMode::Manual);
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;
    ctx.content.block(ContentOp::Install);
    ctx.content.release(ContentOp::Download);
    ctx.settle().await;

    let root = ctx.runtime.live().unwrap().handle().results().root();
    assert_eq!(root.current_state(), UpdateState::InstallStarted);
    assert_eq!(root.last_reported_state(), UpdateState::Idle);

    assert!(ctx.sink.complete_next(true));
    ctx.settle().await;

    let root = ctx.runtime.live().unwrap().handle().results().root();
    assert_eq!(root.current_state(), UpdateState::InstallStarted);
    assert_eq!(root.last_reported_state(), UpdateState::DownloadStarted);
}

#[tokio::test]
async fn sibling_shape_moves_workflow_next_to_agent() {
    let mut config = test_config();
    config.report_shape = ReportShape::Sibling;
    let mut ctx = setup_with_config(config);
    deploy_with_blocked_download(&mut ctx, BUNDLE_WORKFLOW_ID).await;

    let doc = ctx.sink.last().unwrap().json();
    assert_eq!(doc["deviceUpdate"]["workflow"]["id"], BUNDLE_WORKFLOW_ID);
    assert!(doc["deviceUpdate"]["agent"].get("workflow").is_none());
}

#[tokio::test]
async fn custom_namespace_wraps_every_document() {
    let mut config = test_config();
    config.namespace = "otaAgent".to_string();
    let mut ctx = setup_with_config(config);
    ctx.deliver(&bundle_instruction(UpdateAction::ProcessDeployment))
        .await;
    ctx.settle().await;

    assert!(ctx
        .sink
        .sent()
        .iter()
        .all(|sent| sent.json().get("otaAgent").is_some()));
    assert_eq!(ctx.reported(), full_deployment_reports());
}
