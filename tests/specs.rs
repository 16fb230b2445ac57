// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specifications for the otad update agent.
//!
//! These tests are black-box: they run the daemon binary with instructions
//! on stdin and verify the report documents it writes to its log.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// daemon/
#[path = "specs/daemon/config.rs"]
mod daemon_config;
#[path = "specs/daemon/deployment.rs"]
mod daemon_deployment;
#[path = "specs/daemon/help.rs"]
mod daemon_help;
#[path = "specs/daemon/resume.rs"]
mod daemon_resume;
