// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result model shared by phase callbacks, the result tree, and cloud reports.
//!
//! A result is a `(code, extended_code, details)` triple. Codes `<= 0` are
//! failures, codes `> 0` are successes; the two ranges never overlap.
//! `extended_code` is opaque diagnostic detail and only meaningful on failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known result codes.
pub mod code {
    pub const FAILURE: i32 = 0;
    pub const FAILURE_CANCELLED: i32 = -1;
    pub const SUCCESS: i32 = 1;

    pub const IDLE_SUCCESS: i32 = 300;

    pub const DOWNLOAD_SUCCESS: i32 = 500;
    pub const DOWNLOAD_IN_PROGRESS: i32 = 501;
    pub const DOWNLOAD_SKIPPED_FILE_EXISTS: i32 = 502;
    pub const DOWNLOAD_SKIPPED_UPDATE_ALREADY_INSTALLED: i32 = 503;
    pub const DOWNLOAD_SKIPPED_NO_MATCHING_COMPONENTS: i32 = 504;

    pub const INSTALL_SUCCESS: i32 = 600;
    pub const INSTALL_IN_PROGRESS: i32 = 601;
    pub const INSTALL_SKIPPED_UPDATE_ALREADY_INSTALLED: i32 = 603;
    pub const INSTALL_SKIPPED_NO_MATCHING_COMPONENTS: i32 = 604;
    pub const INSTALL_REQUIRED_IMMEDIATE_REBOOT: i32 = 605;
    pub const INSTALL_REQUIRED_REBOOT: i32 = 606;
    pub const INSTALL_REQUIRED_IMMEDIATE_AGENT_RESTART: i32 = 607;
    pub const INSTALL_REQUIRED_AGENT_RESTART: i32 = 608;

    pub const APPLY_SUCCESS: i32 = 700;
    pub const APPLY_IN_PROGRESS: i32 = 701;
    pub const APPLY_REQUIRED_IMMEDIATE_REBOOT: i32 = 705;
    pub const APPLY_REQUIRED_REBOOT: i32 = 706;
    pub const APPLY_REQUIRED_IMMEDIATE_AGENT_RESTART: i32 = 707;
    pub const APPLY_REQUIRED_AGENT_RESTART: i32 = 708;

    pub const CANCEL_SUCCESS: i32 = 800;
    pub const CANCEL_UNABLE_TO_CANCEL: i32 = 801;

    pub const IS_INSTALLED_INSTALLED: i32 = 900;
    pub const IS_INSTALLED_NOT_INSTALLED: i32 = 901;
}

/// Extended result codes: `(facility << 28) | (component << 20) | value`.
pub mod erc {
    /// Facility for raw `errno` values.
    pub const FACILITY_ERRNO: u32 = 0x1;
    /// Facility for errors raised by the workflow orchestrator itself.
    pub const FACILITY_WORKFLOW: u32 = 0x3;

    pub const COMPONENT_ENGINE: u32 = 0x01;
    pub const COMPONENT_PERSISTENCE: u32 = 0x02;
    pub const COMPONENT_TRANSPORT: u32 = 0x03;
    pub const COMPONENT_CONTENT: u32 = 0x04;

    /// Compose an extended result code.
    pub const fn make(facility: u32, component: u32, value: u32) -> i32 {
        (((facility & 0xF) << 28) | ((component & 0xFF) << 20) | (value & 0xF_FFFF)) as i32
    }

    /// Wrap an `errno` value.
    pub const fn from_errno(errno: u32) -> i32 {
        make(FACILITY_ERRNO, 0, errno)
    }

    pub const NOT_PERMITTED: i32 = from_errno(1);
    pub const NO_MEMORY: i32 = from_errno(12);

    pub const MALFORMED_INSTRUCTION: i32 = make(FACILITY_WORKFLOW, COMPONENT_ENGINE, 1);
    pub const INVALID_COMPONENT_PATH: i32 = make(FACILITY_WORKFLOW, COMPONENT_ENGINE, 2);
    pub const WORKER_LOST: i32 = make(FACILITY_WORKFLOW, COMPONENT_ENGINE, 3);
    pub const DEVICE_CONTROL_FAILED: i32 = make(FACILITY_WORKFLOW, COMPONENT_ENGINE, 5);
    pub const PERSISTENCE_WRITE_FAILED: i32 = make(FACILITY_WORKFLOW, COMPONENT_PERSISTENCE, 1);
    pub const TRANSPORT_REJECTED: i32 = make(FACILITY_WORKFLOW, COMPONENT_TRANSPORT, 1);
    pub const SANDBOX_CREATE_FAILED: i32 = make(FACILITY_WORKFLOW, COMPONENT_CONTENT, 1);
    pub const COMPONENT_FAILED: i32 = make(FACILITY_WORKFLOW, COMPONENT_CONTENT, 2);

    /// Split a code back into `(facility, component, value)`.
    pub const fn parts(code: i32) -> (u32, u32, u32) {
        let raw = code as u32;
        (raw >> 28, (raw >> 20) & 0xFF, raw & 0xF_FFFF)
    }
}

/// Outcome of one phase or component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub result_code: i32,
    pub extended_result_code: i32,
    #[serde(default)]
    pub result_details: String,
}

impl UpdateResult {
    pub fn new(result_code: i32) -> Self {
        Self {
            result_code,
            extended_result_code: 0,
            result_details: String::new(),
        }
    }

    /// A failure carrying an extended code.
    pub fn failure(extended_result_code: i32) -> Self {
        Self {
            result_code: code::FAILURE,
            extended_result_code,
            result_details: String::new(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(code::FAILURE_CANCELLED)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.result_details = details.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.result_code > 0
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn is_cancelled(&self) -> bool {
        self.result_code == code::FAILURE_CANCELLED
    }

    /// Success codes that also ask for a device reboot before continuing.
    pub fn requires_reboot(&self) -> bool {
        matches!(
            self.result_code,
            code::INSTALL_REQUIRED_IMMEDIATE_REBOOT
                | code::INSTALL_REQUIRED_REBOOT
                | code::APPLY_REQUIRED_IMMEDIATE_REBOOT
                | code::APPLY_REQUIRED_REBOOT
        )
    }

    /// Success codes that also ask for an agent restart before continuing.
    pub fn requires_agent_restart(&self) -> bool {
        matches!(
            self.result_code,
            code::INSTALL_REQUIRED_IMMEDIATE_AGENT_RESTART
                | code::INSTALL_REQUIRED_AGENT_RESTART
                | code::APPLY_REQUIRED_IMMEDIATE_AGENT_RESTART
                | code::APPLY_REQUIRED_AGENT_RESTART
        )
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result_code)?;
        if self.extended_result_code != 0 {
            write!(f, " (erc 0x{:08x})", self.extended_result_code as u32)?;
        }
        if !self.result_details.is_empty() {
            write!(f, ": {}", self.result_details)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
