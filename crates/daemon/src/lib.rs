// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OTA update agent daemon library
//!
//! Exposes the configuration collaborator so tooling can validate a config
//! file without starting the daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;

pub use config::{AgentConfig, AgentEntry, ConfigError, WorkflowSettings};
