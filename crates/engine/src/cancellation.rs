// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What to do with an instruction that arrives while a workflow is live.

use ota_core::{CancellationType, UpdateState, WorkflowHandle};
use std::fmt;

/// Why an incoming instruction was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Cancel arrived with no live workflow.
    NothingToCancel,
    /// Re-delivery of the live workflow's instruction.
    Duplicate,
    /// The live workflow failed; only a retry token restarts it.
    AwaitingRetry,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            IgnoreReason::NothingToCancel => "nothing to cancel",
            IgnoreReason::Duplicate => "duplicate",
            IgnoreReason::AwaitingRetry => "failed workflow awaiting retry",
        };
        f.write_str(reason)
    }
}

/// Outcome of evaluating an incoming instruction against the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeDecision {
    /// No live workflow: start the incoming one.
    Start,
    /// Normal cancellation of the live workflow.
    Cancel,
    /// Cancel the live workflow, then start the incoming one from Idle.
    /// Carries `Replacement` or `Retry`.
    Supersede(CancellationType),
    /// Same workflow asks for a later phase: keep going from where it is.
    Continue,
    Ignore(IgnoreReason),
}

/// Decide how `incoming` affects the `live` workflow.
///
/// | incoming vs live                          | decision                 |
/// |-------------------------------------------|--------------------------|
/// | any, nothing live                         | start (cancel: ignore)   |
/// | cancel, any id                            | Normal cancel            |
/// | different id                              | Replacement              |
/// | same id, new retry token                  | Retry                    |
/// | same id, same token, operation running    | ignore                   |
/// | same id, same token, later phase asked    | continue                 |
pub fn decide(live: Option<&WorkflowHandle>, incoming: &WorkflowHandle) -> IntakeDecision {
    let Some(live) = live else {
        return if incoming.is_cancel_request() {
            IntakeDecision::Ignore(IgnoreReason::NothingToCancel)
        } else {
            IntakeDecision::Start
        };
    };

    // Cancel targets whatever is live, whatever id it names.
    if incoming.is_cancel_request() {
        return IntakeDecision::Cancel;
    }
    let same_id = live.workflow_id() == incoming.workflow_id();
    if !same_id {
        return IntakeDecision::Supersede(CancellationType::Replacement);
    }
    if incoming
        .retry_token()
        .is_some_and(|token| live.retry_token() != Some(token))
    {
        return IntakeDecision::Supersede(CancellationType::Retry);
    }
    if live.operation_in_progress() {
        return IntakeDecision::Ignore(IgnoreReason::Duplicate);
    }
    if live.state() == UpdateState::Failed {
        return IntakeDecision::Ignore(IgnoreReason::AwaitingRetry);
    }
    match incoming.target_phase() {
        Some(phase) if !live.state().has_completed(phase) => IntakeDecision::Continue,
        _ => IntakeDecision::Ignore(IgnoreReason::Duplicate),
    }
}

#[cfg(test)]
#[path = "cancellation_tests.rs"]
mod tests;
