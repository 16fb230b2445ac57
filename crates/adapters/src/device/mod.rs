// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device control: the reboot / agent-restart trigger.

mod noop;

pub use noop::NoOpDeviceControl;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DeviceCall, FakeDeviceControl};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from device control operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceControlError {
    #[error("reboot failed: {0}")]
    RebootFailed(String),
    #[error("agent restart failed: {0}")]
    RestartFailed(String),
}

/// Adapter that reboots the device or restarts the agent
#[async_trait]
pub trait DeviceControl: Clone + Send + Sync + 'static {
    async fn reboot(&self) -> Result<(), DeviceControlError>;

    async fn restart_agent(&self) -> Result<(), DeviceControlError>;
}
