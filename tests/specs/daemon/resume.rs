// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resume specs: workflow state survives daemon restarts

use crate::prelude::*;
use crate::prelude::assert_eq;

fn legacy(action: UpdateAction) -> String {
    InstructionBuilder::new("legacy-1").action(action).build()
}

#[test]
fn legacy_download_stops_at_its_phase_and_persists() {
    let device = Device::new();

    let reports = device.run(&[legacy(UpdateAction::Download)]);

    assert_eq!(
        reports,
        vec![nested_doc(1, 501, "legacy-1"), nested_doc(2, 500, "legacy-1")]
    );
    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(device.snapshot_path()).unwrap()).unwrap();
    assert_eq!(snapshot["workflowId"], "legacy-1");
}

#[test]
fn restarted_daemon_continues_legacy_workflow() {
    let device = Device::new();
    device.run(&[legacy(UpdateAction::Download)]);

    let reports = device.run(&[legacy(UpdateAction::Install)]);

    assert_eq!(
        reports,
        vec![
            // Resumed state is re-announced before the follow-up runs.
            nested_doc(2, 500, "legacy-1"),
            nested_doc(3, 601, "legacy-1"),
            nested_doc(4, 600, "legacy-1"),
        ]
    );
}

#[test]
fn corrupt_snapshot_is_set_aside() {
    let device = Device::new();
    std::fs::create_dir_all(device.snapshot_path().parent().unwrap()).unwrap();
    std::fs::write(device.snapshot_path(), "{truncated").unwrap();

    let reports = device.run(&[bundle_instruction(UpdateAction::ProcessDeployment)]);

    assert_eq!(reports.len(), 6);
    assert!(device.snapshot_path().with_extension("bak").exists());
}
