// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow states, actions, and the small enums persisted alongside them.
//!
//! All of these travel as integers, both in cloud reports and in the
//! persistence snapshot, so each converts to and from `u8` and serializes
//! through it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An integer did not map to a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: u8,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = UnknownValue;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $value => Ok($name::$variant), )+
                    other => Err(UnknownValue { kind: $kind, value: other }),
                }
            }
        }
    };
}

wire_enum! {
    /// Reported workflow state.
    pub enum UpdateState as "state" {
        Idle = 0,
        DownloadStarted = 1,
        DownloadSucceeded = 2,
        InstallStarted = 3,
        InstallSucceeded = 4,
        ApplyStarted = 5,
        ApplySucceeded = 6,
        Failed = 255,
    }
}

impl UpdateState {
    /// Idle and Failed end a phase sequence; everything else is resumable.
    pub fn is_terminal(self) -> bool {
        matches!(self, UpdateState::Idle | UpdateState::Failed)
    }

    /// The phase this state belongs to, if any.
    pub fn phase(self) -> Option<Phase> {
        match self {
            UpdateState::DownloadStarted | UpdateState::DownloadSucceeded => Some(Phase::Download),
            UpdateState::InstallStarted | UpdateState::InstallSucceeded => Some(Phase::Install),
            UpdateState::ApplyStarted | UpdateState::ApplySucceeded => Some(Phase::Apply),
            UpdateState::Idle | UpdateState::Failed => None,
        }
    }

    pub fn is_succeeded(self) -> bool {
        matches!(
            self,
            UpdateState::DownloadSucceeded
                | UpdateState::InstallSucceeded
                | UpdateState::ApplySucceeded
        )
    }

    /// Whether `phase` has already completed successfully in this state.
    pub fn has_completed(self, phase: Phase) -> bool {
        match (self.phase(), self.is_succeeded()) {
            (Some(current), true) => current >= phase,
            (Some(current), false) => current > phase,
            (None, _) => false,
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateState::Idle => "Idle",
            UpdateState::DownloadStarted => "DownloadStarted",
            UpdateState::DownloadSucceeded => "DownloadSucceeded",
            UpdateState::InstallStarted => "InstallStarted",
            UpdateState::InstallSucceeded => "InstallSucceeded",
            UpdateState::ApplyStarted => "ApplyStarted",
            UpdateState::ApplySucceeded => "ApplySucceeded",
            UpdateState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

wire_enum! {
    /// Instruction action code (`workflow.action`).
    pub enum UpdateAction as "action" {
        Download = 0,
        Install = 1,
        Apply = 2,
        ProcessDeployment = 3,
        Cancel = 255,
    }
}

impl UpdateAction {
    pub fn is_cancel(self) -> bool {
        self == UpdateAction::Cancel
    }

    /// Last phase this action asks the agent to complete.
    ///
    /// `ProcessDeployment` runs the whole sequence, so its target is Apply.
    pub fn target_phase(self) -> Option<Phase> {
        match self {
            UpdateAction::Download => Some(Phase::Download),
            UpdateAction::Install => Some(Phase::Install),
            UpdateAction::Apply | UpdateAction::ProcessDeployment => Some(Phase::Apply),
            UpdateAction::Cancel => None,
        }
    }
}

/// Side-effecting phases, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Download,
    Install,
    Apply,
}

impl Phase {
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Download => Some(Phase::Install),
            Phase::Install => Some(Phase::Apply),
            Phase::Apply => None,
        }
    }

    pub fn started_state(self) -> UpdateState {
        match self {
            Phase::Download => UpdateState::DownloadStarted,
            Phase::Install => UpdateState::InstallStarted,
            Phase::Apply => UpdateState::ApplyStarted,
        }
    }

    pub fn succeeded_state(self) -> UpdateState {
        match self {
            Phase::Download => UpdateState::DownloadSucceeded,
            Phase::Install => UpdateState::InstallSucceeded,
            Phase::Apply => UpdateState::ApplySucceeded,
        }
    }

    /// Result code reported while the phase is running.
    pub fn in_progress_code(self) -> i32 {
        match self {
            Phase::Download => crate::result::code::DOWNLOAD_IN_PROGRESS,
            Phase::Install => crate::result::code::INSTALL_IN_PROGRESS,
            Phase::Apply => crate::result::code::APPLY_IN_PROGRESS,
        }
    }

    /// Result code a phase callback returns on plain success.
    pub fn success_code(self) -> i32 {
        match self {
            Phase::Download => crate::result::code::DOWNLOAD_SUCCESS,
            Phase::Install => crate::result::code::INSTALL_SUCCESS,
            Phase::Apply => crate::result::code::APPLY_SUCCESS,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Download => f.write_str("download"),
            Phase::Install => f.write_str("install"),
            Phase::Apply => f.write_str("apply"),
        }
    }
}

wire_enum! {
    /// Why a live workflow was asked to stop.
    #[derive(Default)]
    pub enum CancellationType as "cancellation type" {
        #[default]
        None = 0,
        /// Explicit cancel action from the cloud.
        Normal = 1,
        /// A different workflow id arrived.
        Replacement = 2,
        /// The same workflow id arrived with a new retry token.
        Retry = 3,
    }
}

wire_enum! {
    #[derive(Default)]
    pub enum SystemRebootState as "system reboot state" {
        #[default]
        None = 0,
        Required = 1,
        InProgress = 2,
    }
}

wire_enum! {
    #[derive(Default)]
    pub enum AgentRestartState as "agent restart state" {
        #[default]
        None = 0,
        Required = 1,
        InProgress = 2,
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
