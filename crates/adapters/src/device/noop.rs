// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op device control.

use super::{DeviceControl, DeviceControlError};
use async_trait::async_trait;

/// Device control that only logs the request.
///
/// The workflow stays suspended until the process is restarted externally.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpDeviceControl;

impl NoOpDeviceControl {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeviceControl for NoOpDeviceControl {
    async fn reboot(&self) -> Result<(), DeviceControlError> {
        tracing::warn!("reboot requested; restart the device to continue the workflow");
        Ok(())
    }

    async fn restart_agent(&self) -> Result<(), DeviceControlError> {
        tracing::warn!("agent restart requested; restart otad to continue the workflow");
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
