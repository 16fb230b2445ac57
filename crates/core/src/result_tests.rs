// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    failure = { code::FAILURE, false },
    cancelled = { code::FAILURE_CANCELLED, false },
    success = { code::SUCCESS, true },
    download = { code::DOWNLOAD_SUCCESS, true },
    install_reboot = { code::INSTALL_REQUIRED_REBOOT, true },
    not_installed = { code::IS_INSTALLED_NOT_INSTALLED, true },
)]
fn success_and_failure_ranges_are_disjoint(result_code: i32, success: bool) {
    let result = UpdateResult::new(result_code);
    assert_eq!(result.is_success(), success);
    assert_eq!(result.is_failure(), !success);
}

#[yare::parameterized(
    install_immediate = { code::INSTALL_REQUIRED_IMMEDIATE_REBOOT },
    install_deferred = { code::INSTALL_REQUIRED_REBOOT },
    apply_immediate = { code::APPLY_REQUIRED_IMMEDIATE_REBOOT },
    apply_deferred = { code::APPLY_REQUIRED_REBOOT },
)]
fn reboot_codes_are_successes_requesting_reboot(result_code: i32) {
    let result = UpdateResult::new(result_code);
    assert!(result.is_success());
    assert!(result.requires_reboot());
    assert!(!result.requires_agent_restart());
}

#[test]
fn agent_restart_codes_request_restart() {
    let result = UpdateResult::new(code::APPLY_REQUIRED_AGENT_RESTART);
    assert!(result.requires_agent_restart());
    assert!(!result.requires_reboot());
}

#[test]
fn failure_carries_extended_code() {
    let result = UpdateResult::failure(erc::NOT_PERMITTED).with_details("denied");
    assert_eq!(result.result_code, code::FAILURE);
    assert_eq!(result.extended_result_code, erc::NOT_PERMITTED);
    assert_eq!(result.result_details, "denied");
}

#[test]
fn cancelled_is_a_failure_distinguished_by_code() {
    let result = UpdateResult::cancelled();
    assert!(result.is_failure());
    assert!(result.is_cancelled());
    assert!(!UpdateResult::failure(0).is_cancelled());
}

#[test]
fn extended_code_round_trips_through_parts() {
    let code = erc::make(erc::FACILITY_WORKFLOW, erc::COMPONENT_PERSISTENCE, 7);
    assert_eq!(
        erc::parts(code),
        (erc::FACILITY_WORKFLOW, erc::COMPONENT_PERSISTENCE, 7)
    );
    assert_eq!(erc::parts(erc::NOT_PERMITTED), (erc::FACILITY_ERRNO, 0, 1));
}

#[test]
fn serializes_with_cloud_field_names() {
    let json = serde_json::to_string(&UpdateResult::new(code::DOWNLOAD_SUCCESS)).unwrap();
    assert_eq!(
        json,
        r#"{"resultCode":500,"extendedResultCode":0,"resultDetails":""}"#
    );
}

#[test]
fn display_includes_extended_code_only_when_set() {
    assert_eq!(UpdateResult::new(code::APPLY_SUCCESS).to_string(), "700");
    let shown = UpdateResult::failure(erc::NOT_PERMITTED).to_string();
    assert_eq!(shown, "0 (erc 0x10000001)");
}
