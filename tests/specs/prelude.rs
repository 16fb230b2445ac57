// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running otad against a scratch state directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use ota_core::test_support::{bundle_instruction, InstructionBuilder, BUNDLE_WORKFLOW_ID};
pub use ota_core::UpdateAction;
pub use similar_asserts::assert_eq;

/// Upper bound for one daemon run; a full simulated deployment takes ~1s.
const RUN_TIMEOUT: Duration = Duration::from_secs(20);

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn otad_binary() -> PathBuf {
    binary_path("otad")
}

pub fn otad() -> assert_cmd::Command {
    assert_cmd::Command::new(otad_binary())
}

/// Agent config with an optional `workflow` section.
pub fn agent_config(workflow: Option<&str>) -> String {
    let mut config = serde_json::json!({
        "schemaVersion": "1.1",
        "aduShellTrustedUsers": ["adu"],
        "manufacturer": "contoso",
        "model": "toaster",
        "agents": [{
            "name": "main",
            "runas": "adu",
            "connectionType": "string",
            "connectionData": "HostName=hub;DeviceId=dev",
            "manufacturer": "contoso",
            "model": "toaster"
        }]
    });
    if let Some(workflow) = workflow {
        config["workflow"] = serde_json::from_str(workflow).unwrap();
    }
    config.to_string()
}

/// A device: a state directory and config file that survive daemon runs.
pub struct Device {
    dir: tempfile::TempDir,
}

impl Device {
    pub fn new() -> Self {
        Self::with_config(&agent_config(None))
    }

    pub fn with_config(config: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("du-config.json"), config).unwrap();
        Self { dir }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("du-config.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir().join("otad.log")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.state_dir().join("workflow").join("snapshot.json")
    }

    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = otad();
        cmd.env("OTA_STATE_DIR", self.state_dir())
            .env("OTA_CONFIG", self.config_path())
            .env("RUST_LOG", "info")
            .timeout(RUN_TIMEOUT);
        cmd
    }

    /// Run the daemon until it has drained `lines`, returning the documents
    /// it reported during this run.
    pub fn run(&self, lines: &[String]) -> Vec<String> {
        let before = self.reported().len();
        let mut input = lines.join("\n");
        input.push('\n');
        self.command().write_stdin(input).assert().success();
        self.reported().split_off(before)
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.log_path()).unwrap_or_default()
    }

    /// Every report document in the log, oldest first.
    pub fn reported(&self) -> Vec<String> {
        self.log()
            .lines()
            .filter_map(|line| line.split_once(" document="))
            .map(|(_, rest)| rest.split_whitespace().next().unwrap_or_default().to_string())
            .collect()
    }
}

/// One nested-shape document under the default namespace.
pub fn nested_doc(state: u8, result_code: i32, workflow_id: &str) -> String {
    format!(
        concat!(
            r#"{{"deviceUpdate":{{"__t":"c","agent":{{"lastInstallResult":{{"updateInstallResult":"#,
            r#"{{"resultCode":{},"extendedResultCode":0,"resultDetails":""}}}},"#,
            r#""state":{},"workflow":{{"action":3,"id":"{}"}}}}}}}}"#,
        ),
        result_code, state, workflow_id
    )
}

/// Idle document announcing the bundle's update id.
pub fn installed_doc(workflow_id: &str) -> String {
    format!(
        concat!(
            r#"{{"deviceUpdate":{{"__t":"c","agent":{{"lastInstallResult":{{"updateInstallResult":"#,
            r#"{{"resultCode":700,"extendedResultCode":0,"resultDetails":""}}}},"#,
            r#""state":0,"workflow":{{"action":3,"id":"{}"}},"#,
            r#""installedUpdateId":"{{\"provider\":\"Microsoft\",\"name\":\"adu\",\"version\":\"1.2.3.4\"}}"}}}}}}"#,
        ),
        workflow_id
    )
}
