// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events consumed by the workflow runtime.

use crate::id::WorkflowId;
use crate::result::UpdateResult;
use crate::state::{Phase, UpdateState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit of work executed on the phase worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Pre-flight "is this update already installed" check.
    IsInstalled,
    Phase(Phase),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::IsInstalled => f.write_str("is_installed"),
            Step::Phase(phase) => write!(f, "{phase}"),
        }
    }
}

/// A component result written by a content handler during a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentUpdate {
    /// Parent path; the component is linked under it if not linked yet.
    pub parent: String,
    pub path: String,
    pub state: UpdateState,
    pub result: UpdateResult,
}

/// What a worker reports back when a step returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub result: UpdateResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentUpdate>,
    #[serde(default)]
    pub reboot_requested: bool,
    #[serde(default)]
    pub restart_requested: bool,
}

impl StepOutcome {
    pub fn new(result: UpdateResult) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    /// True when the step asked for a reboot, explicitly or by result code.
    pub fn wants_reboot(&self) -> bool {
        self.reboot_requested || self.result.requires_reboot()
    }

    pub fn wants_restart(&self) -> bool {
        self.restart_requested || self.result.requires_agent_restart()
    }
}

/// Events that drive the workflow runtime.
///
/// Serializes with `{"type": "event:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A raw instruction arrived from the cloud.
    #[serde(rename = "instruction:received")]
    InstructionReceived { payload: String },

    #[serde(rename = "step:completed")]
    StepCompleted {
        workflow_id: WorkflowId,
        /// Live-workflow generation the step was started for.
        generation: u64,
        step: Step,
        outcome: StepOutcome,
    },

    /// Periodic resend of rejected reports.
    #[serde(rename = "report:retry")]
    ReportRetryTick,

    #[serde(rename = "system:shutdown")]
    Shutdown,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::InstructionReceived { .. } => "instruction:received",
            Event::StepCompleted { .. } => "step:completed",
            Event::ReportRetryTick => "report:retry",
            Event::Shutdown => "system:shutdown",
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::InstructionReceived { payload } => format!("{t} bytes={}", payload.len()),
            Event::StepCompleted {
                workflow_id,
                generation,
                step,
                outcome,
            } => format!(
                "{t} id={workflow_id} gen={generation} step={step} result={}",
                outcome.result
            ),
            Event::ReportRetryTick | Event::Shutdown => t.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
