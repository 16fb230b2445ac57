// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake report sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ReportCompletion, ReportSink, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// How the fake responds to sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Accept and acknowledge immediately.
    #[default]
    AutoAck,
    /// Accept and hold completions until the test resolves them.
    Manual,
    /// Refuse synchronously.
    RejectSync,
    /// Accept, then acknowledge with `accepted = false`.
    RejectAsync,
}

/// Recorded send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReport {
    pub seq: u64,
    pub payload: Vec<u8>,
}

impl SentReport {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Default)]
struct FakeSinkState {
    mode: SinkMode,
    sent: Vec<SentReport>,
    held: VecDeque<ReportCompletion>,
}

#[derive(Clone, Default)]
pub struct FakeReportSink {
    inner: Arc<Mutex<FakeSinkState>>,
}

impl FakeReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: SinkMode) -> Self {
        let sink = Self::default();
        sink.set_mode(mode);
        sink
    }

    pub fn set_mode(&self, mode: SinkMode) {
        self.inner.lock().mode = mode;
    }

    /// Every accepted or rejected send, in order.
    pub fn sent(&self) -> Vec<SentReport> {
        self.inner.lock().sent.clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().iter().map(SentReport::text).collect()
    }

    pub fn last(&self) -> Option<SentReport> {
        self.inner.lock().sent.last().cloned()
    }

    pub fn held(&self) -> usize {
        self.inner.lock().held.len()
    }

    /// Resolve the oldest held completion; false if none was held.
    pub fn complete_next(&self, accepted: bool) -> bool {
        let completion = self.inner.lock().held.pop_front();
        match completion {
            Some(c) => {
                c.complete(accepted);
                true
            }
            None => false,
        }
    }

    /// Take held completions so a test can resolve them out of order.
    pub fn take_held(&self) -> Vec<ReportCompletion> {
        self.inner.lock().held.drain(..).collect()
    }
}

#[async_trait]
impl ReportSink for FakeReportSink {
    async fn send(
        &self,
        payload: Vec<u8>,
        completion: ReportCompletion,
    ) -> Result<(), TransportError> {
        let mode = {
            let mut state = self.inner.lock();
            state.sent.push(SentReport {
                seq: completion.seq(),
                payload,
            });
            state.mode
        };
        match mode {
            SinkMode::AutoAck => completion.complete(true),
            SinkMode::RejectAsync => completion.complete(false),
            SinkMode::Manual => self.inner.lock().held.push_back(completion),
            SinkMode::RejectSync => {
                return Err(TransportError::Unavailable("fake sink offline".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
