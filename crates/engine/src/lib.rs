// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! OTA workflow engine: state machine, cancellation and cloud reporting

mod cancellation;
pub mod document;
mod error;
mod reporter;
mod runtime;
mod slot;

#[cfg(test)]
mod test_helpers;

pub use cancellation::{decide, IgnoreReason, IntakeDecision};
pub use document::{DocumentBuilder, Report, ReportShape, DEFAULT_NAMESPACE};
pub use error::EngineError;
pub use reporter::{ReportingGateway, Submission};
pub use runtime::{Runtime, RuntimeConfig, RuntimeDeps};
pub use slot::{LiveWorkflow, WorkflowSlot};
