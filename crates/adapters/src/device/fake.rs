// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake device control for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DeviceControl, DeviceControlError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recorded device call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    Reboot,
    RestartAgent,
}

#[derive(Default)]
struct FakeDeviceState {
    calls: Vec<DeviceCall>,
    fail: bool,
}

#[derive(Clone, Default)]
pub struct FakeDeviceControl {
    inner: Arc<Mutex<FakeDeviceState>>,
}

impl FakeDeviceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl DeviceControl for FakeDeviceControl {
    async fn reboot(&self) -> Result<(), DeviceControlError> {
        let mut state = self.inner.lock();
        state.calls.push(DeviceCall::Reboot);
        if state.fail {
            return Err(DeviceControlError::RebootFailed("injected".into()));
        }
        Ok(())
    }

    async fn restart_agent(&self) -> Result<(), DeviceControlError> {
        let mut state = self.inner.lock();
        state.calls.push(DeviceCall::RestartAgent);
        if state.fail {
            return Err(DeviceControlError::RestartFailed("injected".into()));
        }
        Ok(())
    }
}
