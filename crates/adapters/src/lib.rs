// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the workflow runtime's collaborators

pub mod content;
pub mod device;
pub mod traced;
pub mod transport;

pub use content::{
    CancelSignal, ContentHandler, DownloadProgress, DownloadState, LogProgressSink, ProgressSink,
    SimulatorContentHandler, SimulatorScript, WorkflowContext,
};
pub use device::{DeviceControl, DeviceControlError, NoOpDeviceControl};
pub use traced::{TracedContent, TracedDevice, TracedSink};
pub use transport::{LogReportSink, ReportAck, ReportCompletion, ReportSink, TransportError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use content::{CollectingProgressSink, ContentCall, ContentOp, FakeContentHandler};
#[cfg(any(test, feature = "test-support"))]
pub use device::{DeviceCall, FakeDeviceControl};
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeReportSink, SentReport, SinkMode};
