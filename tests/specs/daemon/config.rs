// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn missing_config_fails_startup_and_logs_why() {
    let device = Device::new();
    std::fs::remove_file(device.config_path()).unwrap();

    device.command().write_stdin("").assert().failure();

    assert!(
        device.log().contains("ERROR Failed to start daemon: Config error"),
        "log was: {}",
        device.log()
    );
    assert!(!device.state_dir().join("otad.pid").exists());
}

#[test]
fn config_without_agents_is_rejected() {
    let device = Device::with_config(
        r#"{"schemaVersion":"1.1","manufacturer":"contoso","model":"toaster","agents":[]}"#,
    );
    device.command().write_stdin("").assert().failure();
    assert!(device.log().contains("no agents configured"));
}

#[test]
fn sibling_shape_places_workflow_next_to_agent() {
    let device = Device::with_config(&agent_config(Some(r#"{"reportShape":"sibling"}"#)));

    let reports = device.run(&[bundle_instruction(UpdateAction::ProcessDeployment)]);

    assert_eq!(
        reports.last().unwrap(),
        concat!(
            r#"{"deviceUpdate":{"__t":"c","agent":{"lastInstallResult":{"updateInstallResult":"#,
            r#"{"resultCode":700,"extendedResultCode":0,"resultDetails":""}},"state":0},"#,
            r#""workflow":{"action":3,"id":"action_bundle"},"#,
            r#""installedUpdateId":"{\"provider\":\"Microsoft\",\"name\":\"adu\",\"version\":\"1.2.3.4\"}"}}"#,
        )
    );
}

#[test]
fn configured_namespace_wraps_every_document() {
    let device = Device::with_config(&agent_config(Some(r#"{"namespace":"otaAgent"}"#)));

    let reports = device.run(&[bundle_instruction(UpdateAction::ProcessDeployment)]);

    assert_eq!(reports.len(), 6);
    for report in &reports {
        assert!(report.starts_with(r#"{"otaAgent":{"__t":"c","agent":"#), "{report}");
    }
}
