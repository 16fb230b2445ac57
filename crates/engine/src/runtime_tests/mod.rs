// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

mod cancellation;
mod deployment;
mod persistence;
mod reporting;
mod resume;

use crate::test_helpers::{setup, setup_with_config, test_config, TestContext};
use ota_adapters::{ContentOp, DeviceCall, SinkMode};
use ota_core::test_support::{
    bundle_instruction, cancel_instruction, InstructionBuilder, BUNDLE_WORKFLOW_ID,
};
use ota_core::{code, erc, Event, UpdateAction, UpdateResult, UpdateState, WorkflowId};

fn bundle_id() -> WorkflowId {
    WorkflowId::new(BUNDLE_WORKFLOW_ID)
}

/// Every report of a full deployment, in order.
fn full_deployment_reports() -> Vec<(UpdateState, i32)> {
    vec![
        (UpdateState::DownloadStarted, code::DOWNLOAD_IN_PROGRESS),
        (UpdateState::DownloadSucceeded, code::DOWNLOAD_SUCCESS),
        (UpdateState::InstallStarted, code::INSTALL_IN_PROGRESS),
        (UpdateState::InstallSucceeded, code::INSTALL_SUCCESS),
        (UpdateState::ApplyStarted, code::APPLY_IN_PROGRESS),
        (UpdateState::Idle, code::APPLY_SUCCESS),
    ]
}

/// Start a deployment whose download never returns until cancelled.
async fn deploy_with_blocked_download(ctx: &mut TestContext, workflow_id: &str) {
    ctx.content.block(ContentOp::Download);
    ctx.deliver(&InstructionBuilder::new(workflow_id).build())
        .await;
    ctx.settle().await;
}
