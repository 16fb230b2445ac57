// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::result::{code, erc};
use proptest::prelude::*;

fn ok(code: i32) -> UpdateResult {
    UpdateResult::new(code)
}

/// `root -> {root/0, root/1}`, `root/0 -> {root/0/comp0, root/0/comp1}`.
fn bundle_tree() -> ResultTree {
    let mut tree = ResultTree::new();
    tree.add_child("root", "root/0").unwrap();
    tree.add_child("root", "root/1").unwrap();
    tree.add_child("root/0", "root/0/comp0").unwrap();
    tree.add_child("root/0", "root/0/comp1").unwrap();
    tree
}

#[test]
fn new_tree_has_only_root() {
    let tree = ResultTree::new();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.root().path(), ROOT_PATH);
    assert!(tree.children(ROOT_PATH).is_empty());
}

#[test]
fn upsert_requires_existing_parent() {
    let mut tree = ResultTree::new();
    let err = tree
        .upsert("root/0/comp0", ok(code::SUCCESS), UpdateState::Idle)
        .unwrap_err();
    assert_eq!(err, TreeError::InvalidPath("root/0/comp0".into()));

    tree.upsert("root/0", ok(code::SUCCESS), UpdateState::Idle)
        .unwrap();
    tree.upsert("root/0/comp0", ok(code::SUCCESS), UpdateState::Idle)
        .unwrap();
    assert!(tree.contains("root/0/comp0"));
}

#[yare::parameterized(
    empty = { "" },
    trailing_slash = { "root/" },
    unrooted = { "other/0" },
    leading_slash = { "/root" },
)]
fn upsert_rejects_malformed_paths(path: &str) {
    let mut tree = ResultTree::new();
    assert!(tree
        .upsert(path, ok(code::SUCCESS), UpdateState::Idle)
        .is_err());
}

#[test]
fn upsert_leaves_children_alone() {
    let mut tree = bundle_tree();
    tree.upsert("root/0", ok(code::INSTALL_SUCCESS), UpdateState::InstallSucceeded)
        .unwrap();
    assert_eq!(tree.children("root/0"), vec!["root/0/comp0", "root/0/comp1"]);
    assert_eq!(
        tree.get("root/0").unwrap().current_state(),
        UpdateState::InstallSucceeded
    );
}

#[test]
fn add_child_preserves_call_order() {
    let mut tree = ResultTree::new();
    for child in ["root/b", "root/a", "root/c"] {
        tree.add_child("root", child).unwrap();
    }
    assert_eq!(tree.children("root"), vec!["root/b", "root/a", "root/c"]);
}

#[test]
fn add_child_rejects_missing_parent_and_relinks() {
    let mut tree = ResultTree::new();
    assert_eq!(
        tree.add_child("root/9", "root/9/x"),
        Err(TreeError::InvalidPath("root/9".into()))
    );
    tree.add_child("root", "root/0").unwrap();
    assert_eq!(
        tree.add_child("root", "root/0"),
        Err(TreeError::AlreadyLinked("root/0".into()))
    );
}

#[yare::parameterized(
    grandchild = { "root", "root/0/x" },
    sibling_prefix = { "root/0", "root/01" },
    unrelated = { "root", "elsewhere/0" },
)]
fn add_child_requires_direct_descendant(parent: &str, child: &str) {
    let mut tree = ResultTree::new();
    tree.add_child("root", "root/0").unwrap();
    assert_eq!(
        tree.add_child(parent, child),
        Err(TreeError::InvalidPath(child.to_string()))
    );
}

#[test]
fn add_child_links_node_created_by_upsert() {
    let mut tree = ResultTree::new();
    tree.upsert("root/0", ok(code::DOWNLOAD_SUCCESS), UpdateState::DownloadSucceeded)
        .unwrap();
    assert!(!tree.is_linked("root/0"));
    tree.add_child("root", "root/0").unwrap();
    assert!(tree.is_linked("root/0"));
    assert_eq!(
        tree.aggregate("root").unwrap().result_code,
        code::DOWNLOAD_SUCCESS
    );
}

#[test]
fn failing_component_propagates_to_every_ancestor() {
    let mut tree = bundle_tree();
    let failed = UpdateResult::failure(erc::COMPONENT_FAILED);
    tree.upsert("root/0/comp0", failed.clone(), UpdateState::Failed)
        .unwrap();
    tree.upsert("root/0/comp1", ok(code::INSTALL_SUCCESS), UpdateState::InstallSucceeded)
        .unwrap();
    tree.upsert("root/1", ok(code::INSTALL_SUCCESS), UpdateState::InstallSucceeded)
        .unwrap();
    tree.upsert("root", ok(code::INSTALL_SUCCESS), UpdateState::InstallSucceeded)
        .unwrap();

    assert_eq!(tree.aggregate("root/0").unwrap(), failed);
    assert_eq!(tree.aggregate("root").unwrap(), failed);
    assert_eq!(
        tree.aggregate("root/1").unwrap().result_code,
        code::INSTALL_SUCCESS
    );
}

#[test]
fn first_failure_in_child_order_wins() {
    let mut tree = bundle_tree();
    tree.upsert("root/1", UpdateResult::failure(2), UpdateState::Failed)
        .unwrap();
    tree.upsert("root/0/comp1", UpdateResult::failure(1), UpdateState::Failed)
        .unwrap();
    assert_eq!(tree.aggregate("root").unwrap().extended_result_code, 1);
}

#[test]
fn most_recently_updated_child_decides_when_all_succeed() {
    let mut tree = bundle_tree();
    tree.upsert("root/1", ok(code::DOWNLOAD_SUCCESS), UpdateState::DownloadSucceeded)
        .unwrap();
    tree.upsert("root/0/comp0", ok(code::INSTALL_SUCCESS), UpdateState::InstallSucceeded)
        .unwrap();
    assert_eq!(
        tree.aggregate("root").unwrap().result_code,
        code::INSTALL_SUCCESS
    );

    tree.upsert("root/1", ok(code::APPLY_SUCCESS), UpdateState::ApplySucceeded)
        .unwrap();
    assert_eq!(
        tree.aggregate("root").unwrap().result_code,
        code::APPLY_SUCCESS
    );
}

#[test]
fn untouched_children_fall_back_to_own_result() {
    let mut tree = bundle_tree();
    tree.upsert("root", ok(code::DOWNLOAD_SUCCESS), UpdateState::DownloadSucceeded)
        .unwrap();
    assert_eq!(
        tree.aggregate("root").unwrap().result_code,
        code::DOWNLOAD_SUCCESS
    );
}

#[test]
fn aggregate_of_unknown_path_is_an_error() {
    let tree = ResultTree::new();
    assert!(matches!(
        tree.aggregate("root/404"),
        Err(TreeError::InvalidPath(_))
    ));
}

#[test]
fn record_reported_updates_root_and_matching_components() {
    let mut tree = bundle_tree();
    tree.upsert("root", ok(code::DOWNLOAD_SUCCESS), UpdateState::DownloadSucceeded)
        .unwrap();
    tree.upsert("root/1", ok(code::SUCCESS), UpdateState::DownloadStarted)
        .unwrap();
    tree.upsert("root/0", ok(code::DOWNLOAD_SUCCESS), UpdateState::DownloadSucceeded)
        .unwrap();
    tree.record_reported(UpdateState::DownloadSucceeded);
    assert_eq!(
        tree.root().last_reported_state(),
        UpdateState::DownloadSucceeded
    );
    assert_eq!(
        tree.get("root/0").unwrap().last_reported_state(),
        UpdateState::DownloadSucceeded
    );
    assert_eq!(
        tree.get("root/1").unwrap().last_reported_state(),
        UpdateState::Idle
    );
}

#[test]
fn late_ack_still_lands_on_root() {
    let mut tree = ResultTree::new();
    tree.set_state("root", UpdateState::InstallStarted).unwrap();
    tree.record_reported(UpdateState::DownloadStarted);
    assert_eq!(
        tree.root().last_reported_state(),
        UpdateState::DownloadStarted
    );
    assert_eq!(tree.root().current_state(), UpdateState::InstallStarted);
}

#[test]
fn serializes_in_insertion_order() {
    let mut tree = ResultTree::new();
    tree.add_child("root", "root/0").unwrap();
    tree.upsert("root/0", UpdateResult::failure(7).with_details("disk"), UpdateState::Failed)
        .unwrap();

    let json = serde_json::to_string(&tree).unwrap();
    assert_eq!(
        json,
        concat!(
            r#"{"root":{"lastReportedState":0,"currentState":0,"resultCode":0,"extendedResultCode":0,"resultDetails":"","childIds":["root/0"]},"#,
            r#""root/0":{"lastReportedState":0,"currentState":255,"resultCode":0,"extendedResultCode":7,"resultDetails":"disk","childIds":[],"stamp":1}}"#,
        )
    );
}

#[test]
fn deserialized_tree_keeps_structure_and_aggregation() {
    let mut tree = bundle_tree();
    tree.upsert("root/0/comp1", UpdateResult::failure(3), UpdateState::Failed)
        .unwrap();
    tree.upsert("root/1", ok(code::SUCCESS), UpdateState::InstallSucceeded)
        .unwrap();

    let json = serde_json::to_string(&tree).unwrap();
    let restored: ResultTree = serde_json::from_str(&json).unwrap();

    assert_eq!(serde_json::to_string(&restored).unwrap(), json);
    assert_eq!(
        restored.children("root/0"),
        vec!["root/0/comp0", "root/0/comp1"]
    );
    assert_eq!(restored.aggregate("root").unwrap().extended_result_code, 3);
}

#[test]
fn round_trip_keeps_most_recent_write() {
    let mut tree = ResultTree::new();
    tree.add_child("root", "root/0").unwrap();
    tree.add_child("root", "root/1").unwrap();
    tree.upsert("root/0", ok(600), UpdateState::InstallSucceeded)
        .unwrap();
    tree.upsert("root/1", ok(500), UpdateState::InstallSucceeded)
        .unwrap();
    tree.upsert("root/0", ok(601), UpdateState::InstallSucceeded)
        .unwrap();
    assert_eq!(tree.aggregate("root").unwrap().result_code, 601);

    let json = serde_json::to_string(&tree).unwrap();
    let restored: ResultTree = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.aggregate("root").unwrap().result_code, 601);

    // Later writes keep counting past the restored stamps.
    let mut restored = restored;
    restored
        .upsert("root/1", ok(502), UpdateState::InstallSucceeded)
        .unwrap();
    assert_eq!(restored.aggregate("root").unwrap().result_code, 502);
}

#[test]
fn unstamped_records_use_file_order() {
    let json = concat!(
        r#"{"root":{"lastReportedState":0,"currentState":0,"resultCode":0,"extendedResultCode":0,"childIds":["root/0","root/1"]},"#,
        r#""root/0":{"lastReportedState":0,"currentState":4,"resultCode":600,"extendedResultCode":0},"#,
        r#""root/1":{"lastReportedState":0,"currentState":4,"resultCode":500,"extendedResultCode":0}}"#,
    );
    let tree: ResultTree = serde_json::from_str(json).unwrap();
    assert_eq!(tree.aggregate("root").unwrap().result_code, 500);
}

#[test]
fn deserialize_rejects_missing_root_or_dangling_child() {
    let no_root = r#"{"root/0":{"lastReportedState":0,"currentState":0,"resultCode":0,"extendedResultCode":0}}"#;
    assert!(serde_json::from_str::<ResultTree>(no_root).is_err());

    let dangling = r#"{"root":{"lastReportedState":0,"currentState":0,"resultCode":0,"extendedResultCode":0,"childIds":["elsewhere/1"]}}"#;
    assert!(serde_json::from_str::<ResultTree>(dangling).is_err());
}

proptest! {
    #[test]
    fn root_fails_iff_some_component_failed(
        leaves in prop::collection::vec((0usize..3, 0usize..3, any::<bool>()), 1..12)
    ) {
        let mut tree = ResultTree::new();
        let mut any_failed = false;
        for (group, comp, failed) in leaves {
            let group_path = format!("root/{group}");
            let leaf_path = format!("{group_path}/comp{comp}");
            if !tree.is_linked(&group_path) {
                tree.add_child("root", &group_path).unwrap();
            }
            if !tree.is_linked(&leaf_path) {
                tree.add_child(&group_path, &leaf_path).unwrap();
            }
            let result = if failed {
                UpdateResult::failure(1)
            } else {
                UpdateResult::new(code::INSTALL_SUCCESS)
            };
            tree.upsert(&leaf_path, result, UpdateState::InstallSucceeded).unwrap();
            // Only the latest write per leaf counts.
            any_failed = tree
                .children("root")
                .iter()
                .flat_map(|g| tree.children(g))
                .any(|leaf| tree.get(leaf).unwrap().result().is_failure());
        }
        prop_assert_eq!(tree.aggregate("root").unwrap().is_failure(), any_failed);
    }
}
