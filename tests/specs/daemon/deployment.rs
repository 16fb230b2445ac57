// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment specs: one instruction driven through every phase

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn deployment_reports_every_phase_then_installed_idle() {
    let device = Device::new();

    let reports = device.run(&[bundle_instruction(UpdateAction::ProcessDeployment)]);

    assert_eq!(
        reports,
        vec![
            nested_doc(1, 501, BUNDLE_WORKFLOW_ID),
            nested_doc(2, 500, BUNDLE_WORKFLOW_ID),
            nested_doc(3, 601, BUNDLE_WORKFLOW_ID),
            nested_doc(4, 600, BUNDLE_WORKFLOW_ID),
            nested_doc(5, 701, BUNDLE_WORKFLOW_ID),
            installed_doc(BUNDLE_WORKFLOW_ID),
        ]
    );
}

#[test]
fn finished_deployment_leaves_no_snapshot() {
    let device = Device::new();
    device.run(&[bundle_instruction(UpdateAction::ProcessDeployment)]);
    assert!(!device.snapshot_path().exists());
}

#[test]
fn malformed_line_is_skipped() {
    let device = Device::new();

    let reports = device.run(&[
        "{not json".to_string(),
        bundle_instruction(UpdateAction::ProcessDeployment),
    ]);

    assert_eq!(reports.len(), 6);
    assert!(device.log().contains("malformed instruction"));
}

#[test]
fn empty_input_exits_without_reports() {
    let device = Device::new();
    device.command().write_stdin("").assert().success();
    assert!(device.reported().is_empty());
    assert!(device.log().contains("--- otad: starting (pid: "));
}
