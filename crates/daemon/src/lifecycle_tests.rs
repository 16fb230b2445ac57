// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ota_core::test_support::bundle_instruction;
use ota_core::UpdateAction;
use tempfile::TempDir;

const AGENT_CONFIG: &str = r#"{
    "schemaVersion": "1.1",
    "manufacturer": "contoso",
    "model": "toaster",
    "agents": [{
        "name": "main",
        "runas": "adu",
        "connectionType": "string",
        "connectionData": "HostName=hub",
        "manufacturer": "contoso",
        "model": "toaster"
    }]
}"#;

fn test_config(dir: &TempDir) -> Config {
    let config_path = dir.path().join("du-config.json");
    std::fs::write(&config_path, AGENT_CONFIG).unwrap();
    Config::for_state_dir(dir.path().join("state"), config_path)
}

#[test]
fn config_paths_live_under_state_dir() {
    let config = Config::for_state_dir("/srv/otad".into(), "/etc/du.json".into());
    assert_eq!(config.lock_path, PathBuf::from("/srv/otad/otad.pid"));
    assert_eq!(config.log_path, PathBuf::from("/srv/otad/otad.log"));
    assert_eq!(config.config_path, PathBuf::from("/etc/du.json"));
}

#[tokio::test]
async fn startup_on_empty_state_dir_is_idle() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let daemon = startup(&config).await.unwrap();

    assert!(daemon.runtime.live().is_none());
    assert_eq!(daemon.agent.model, "toaster");
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[tokio::test]
async fn second_daemon_fails_to_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let _first = startup(&config).await.unwrap();
    let second = startup(&config).await;

    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    // The running daemon's pid file survives.
    assert!(config.lock_path.exists());
}

#[tokio::test]
async fn missing_config_fails_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().join("state"), dir.path().join("absent.json"));

    let result = startup(&config).await;

    assert!(matches!(
        result,
        Err(LifecycleError::Config(ConfigError::Io { .. }))
    ));
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn shutdown_removes_pid_file_and_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let mut daemon = startup(&config).await.unwrap();
    daemon.shutdown().unwrap();
    assert!(!config.lock_path.exists());
    drop(daemon);

    assert!(startup(&config).await.is_ok());
}

#[tokio::test]
async fn processed_instruction_becomes_live() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let mut daemon = startup(&config).await.unwrap();

    daemon
        .process_event(Event::InstructionReceived {
            payload: bundle_instruction(UpdateAction::ProcessDeployment),
        })
        .await;

    assert!(daemon.runtime.live().is_some());
    assert!(daemon.step_in_flight());
}

#[tokio::test]
async fn malformed_instruction_is_logged_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let mut daemon = startup(&config).await.unwrap();

    daemon
        .process_event(Event::InstructionReceived {
            payload: "{not json".to_string(),
        })
        .await;

    assert!(daemon.runtime.live().is_none());
}
