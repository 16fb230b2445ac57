// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Config file used when `OTA_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/otad/du-config.json";

/// Resolve state directory: OTA_STATE_DIR > XDG_STATE_HOME/otad > ~/.local/state/otad
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("OTA_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("otad"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/otad"))
}

pub fn config_path() -> PathBuf {
    std::env::var("OTA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
