// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ota_core::test_support::InstructionBuilder;
use ota_core::{code, UpdateResult};
use tempfile::tempdir;

fn live_handle() -> WorkflowHandle {
    let payload = InstructionBuilder::new("wf-1").retry("r1").build();
    let mut handle = WorkflowHandle::parse(&payload).unwrap();
    handle.set_state_and_result(
        UpdateState::DownloadSucceeded,
        UpdateResult::new(code::DOWNLOAD_SUCCESS),
    );
    handle.set_system_reboot_state(SystemRebootState::Required);
    handle
}

#[test]
fn capture_copies_resumable_fields() {
    let handle = live_handle();
    let snapshot = WorkflowSnapshot::capture(&handle);

    assert_eq!(snapshot.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(snapshot.workflow_id, "wf-1");
    assert_eq!(snapshot.state, UpdateState::DownloadSucceeded);
    assert_eq!(snapshot.cancellation_type, CancellationType::None);
    assert_eq!(snapshot.system_reboot_state, SystemRebootState::Required);
    assert_eq!(snapshot.agent_restart_state, AgentRestartState::None);
    assert_eq!(snapshot.instruction, handle.instruction().raw());
    assert_eq!(
        snapshot.results.root().result().result_code,
        code::DOWNLOAD_SUCCESS
    );
}

#[test]
fn json_field_names_are_camel_case() {
    let snapshot = WorkflowSnapshot::capture(&live_handle());
    let value = serde_json::to_value(&snapshot).unwrap();
    for key in [
        "version",
        "workflowId",
        "state",
        "cancellationType",
        "systemRebootState",
        "agentRestartState",
        "results",
        "instruction",
        "savedAt",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["state"], 2);
    assert_eq!(value["systemRebootState"], 1);
}

#[yare::parameterized(
    idle = { UpdateState::Idle, false },
    failed = { UpdateState::Failed, false },
    download_started = { UpdateState::DownloadStarted, true },
    install_succeeded = { UpdateState::InstallSucceeded, true },
    apply_succeeded = { UpdateState::ApplySucceeded, true },
)]
fn resumable_only_mid_sequence(state: UpdateState, expected: bool) {
    let mut snapshot = WorkflowSnapshot::capture(&live_handle());
    snapshot.state = state;
    assert_eq!(snapshot.is_resumable(), expected);
}

#[test]
fn from_slice_rejects_other_versions() {
    let mut snapshot = WorkflowSnapshot::capture(&live_handle());
    snapshot.version = 99;
    let bytes = serde_json::to_vec(&snapshot).unwrap();
    assert!(matches!(
        WorkflowSnapshot::from_slice(&bytes),
        Err(SnapshotError::UnsupportedVersion(99))
    ));
}

#[test]
fn rotate_bak_path_keeps_three_backups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    for round in 1..=4 {
        std::fs::write(&path, format!("corrupt {round}")).unwrap();
        let bak = rotate_bak_path(&path);
        std::fs::rename(&path, &bak).unwrap();
    }

    let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
    assert_eq!(read("snapshot.bak"), "corrupt 4");
    assert_eq!(read("snapshot.bak.2"), "corrupt 3");
    assert_eq!(read("snapshot.bak.3"), "corrupt 2");
    assert!(!dir.path().join("snapshot.bak.4").exists());
}
