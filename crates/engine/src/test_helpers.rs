// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{Runtime, RuntimeConfig, RuntimeDeps};
use ota_adapters::{
    CollectingProgressSink, FakeContentHandler, FakeDeviceControl, FakeReportSink, ReportAck,
};
use ota_core::{Event, UpdateState};
use ota_storage::{
    snapshot_path, FakeSnapshotWriter, FsSnapshotWriter, PersistenceStore, SnapshotWriter,
    WorkflowSnapshot,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Convenience alias for the fully-typed test runtime.
pub(crate) type TestRuntime<W = FakeSnapshotWriter> =
    Runtime<FakeContentHandler, FakeReportSink, FakeDeviceControl, W>;

/// How long `settle` waits for another event before giving up.
const QUIET: Duration = Duration::from_millis(50);

/// Test context holding the runtime, its fakes and the channels it feeds.
pub(crate) struct TestContext<W: SnapshotWriter = FakeSnapshotWriter> {
    pub runtime: TestRuntime<W>,
    pub event_rx: mpsc::Receiver<Event>,
    pub ack_rx: mpsc::UnboundedReceiver<ReportAck>,
    pub content: FakeContentHandler,
    pub sink: FakeReportSink,
    pub device: FakeDeviceControl,
    pub writer: W,
    pub config: RuntimeConfig,
}

pub(crate) fn test_config() -> RuntimeConfig {
    RuntimeConfig::new("/var/lib/otad-test")
}

pub(crate) fn setup() -> TestContext {
    setup_with_config(test_config())
}

pub(crate) fn setup_with_config(config: RuntimeConfig) -> TestContext {
    build(config, FakeSnapshotWriter::new())
}

/// A runtime persisting to a real directory.
pub(crate) fn setup_on_disk(state_dir: &Path) -> TestContext<FsSnapshotWriter> {
    build(RuntimeConfig::new(state_dir), FsSnapshotWriter)
}

fn build<W: SnapshotWriter + Clone>(config: RuntimeConfig, writer: W) -> TestContext<W> {
    let content = FakeContentHandler::new();
    let sink = FakeReportSink::new();
    let device = FakeDeviceControl::new();
    let (event_tx, event_rx) = mpsc::channel(100);
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let store = PersistenceStore::with_writer(snapshot_path(&config.state_dir), writer.clone());
    let runtime = Runtime::new(
        RuntimeDeps {
            content: content.clone(),
            sink: sink.clone(),
            device: device.clone(),
            store,
            progress: Arc::new(CollectingProgressSink::new()),
        },
        config.clone(),
        event_tx,
        ack_tx,
    );

    TestContext {
        runtime,
        event_rx,
        ack_rx,
        content,
        sink,
        device,
        writer,
        config,
    }
}

impl<W: SnapshotWriter + Clone> TestContext<W> {
    /// A fresh process over the same disk: new fakes, same snapshot writer.
    pub fn restart(&self) -> TestContext<W> {
        build(self.config.clone(), self.writer.clone())
    }

    pub async fn deliver(&mut self, payload: &str) {
        self.runtime
            .handle_event(Event::InstructionReceived {
                payload: payload.to_string(),
            })
            .await
            .unwrap();
    }

    /// Feed acks and step completions back into the runtime until nothing
    /// arrives for a while. Acks go first so report order is preserved.
    pub async fn settle(&mut self) {
        loop {
            tokio::select! {
                biased;
                Some(ack) = self.ack_rx.recv() => self.runtime.handle_ack(ack).await,
                Some(event) = self.event_rx.recv() => {
                    self.runtime.handle_event(event).await.unwrap();
                }
                _ = tokio::time::sleep(QUIET) => break,
            }
        }
    }

    /// `(state, resultCode)` of every document sent, in order.
    pub fn reported(&self) -> Vec<(UpdateState, i32)> {
        self.sink
            .sent()
            .iter()
            .map(|sent| {
                let json = sent.json();
                let agent = &json[&self.config.namespace]["agent"];
                let state = agent["state"].as_u64().unwrap();
                let code = agent["lastInstallResult"]["updateInstallResult"]["resultCode"]
                    .as_i64()
                    .unwrap();
                (
                    UpdateState::try_from(u8::try_from(state).unwrap()).unwrap(),
                    i32::try_from(code).unwrap(),
                )
            })
            .collect()
    }

    pub fn last_reported(&self) -> Option<(UpdateState, i32)> {
        self.reported().last().copied()
    }

    /// Extended result code of the last document sent.
    pub fn last_extended_code(&self) -> i64 {
        let last = self.sink.last().unwrap().json();
        last[&self.config.namespace]["agent"]["lastInstallResult"]["updateInstallResult"]
            ["extendedResultCode"]
            .as_i64()
            .unwrap()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        snapshot_path(&self.config.state_dir)
    }
}

impl TestContext {
    /// The snapshot currently on (fake) disk.
    pub fn snapshot(&self) -> Option<WorkflowSnapshot> {
        self.writer
            .contents(&self.snapshot_path())
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }
}
