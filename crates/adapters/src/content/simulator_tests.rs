// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::content::{CancelSignal, CollectingProgressSink};
use ota_core::test_support::InstructionBuilder;
use ota_core::{CancellationFlag, CancellationType, Instruction};
use std::path::Path;

fn fast_script() -> SimulatorScript {
    SimulatorScript {
        step_delay: Duration::from_millis(1),
        chunks: 2,
        ..SimulatorScript::default()
    }
}

fn context(
    work_dir: &Path,
    progress: Arc<CollectingProgressSink>,
) -> (WorkflowContext, CancelSignal) {
    let payload = InstructionBuilder::new("wf-sim")
        .file("f1", "image.swu", "abc=")
        .build();
    let instruction = Instruction::parse(&payload).unwrap();
    let signal = CancelSignal::new(Arc::new(CancellationFlag::new()));
    let ctx = WorkflowContext::new(
        instruction.workflow_id().clone(),
        instruction.action(),
        instruction.content().cloned(),
        work_dir.to_path_buf(),
        signal.clone(),
        progress,
    );
    (ctx, signal)
}

#[tokio::test]
async fn full_sequence_marks_update_installed() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("sandbox");
    let progress = Arc::new(CollectingProgressSink::new());
    let (ctx, _) = context(&work_dir, Arc::clone(&progress));
    let sim = SimulatorContentHandler::new(fast_script());

    assert_eq!(
        sim.is_installed(&ctx).await.result_code,
        code::IS_INSTALLED_NOT_INSTALLED
    );
    assert!(sim.sandbox_create(&ctx).await.is_success());
    assert!(work_dir.is_dir());

    assert_eq!(sim.download(&ctx).await.result_code, code::DOWNLOAD_SUCCESS);
    assert_eq!(sim.install(&ctx).await.result_code, code::INSTALL_SUCCESS);
    assert_eq!(sim.apply(&ctx).await.result_code, code::APPLY_SUCCESS);

    assert_eq!(
        sim.is_installed(&ctx).await.result_code,
        code::IS_INSTALLED_INSTALLED
    );

    sim.sandbox_destroy(&ctx).await;
    assert!(!work_dir.exists());
}

#[tokio::test]
async fn download_reports_progress_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(CollectingProgressSink::new());
    let (ctx, _) = context(dir.path(), Arc::clone(&progress));
    let sim = SimulatorContentHandler::new(fast_script());

    sim.download(&ctx).await;

    let updates = progress.updates();
    // Two files, each NotStarted + 2 chunks.
    assert_eq!(updates.len(), 6);
    assert_eq!(updates[0].state, DownloadState::NotStarted);
    assert_eq!(updates[2].state, DownloadState::Completed);
    assert_eq!(updates[2].bytes_transferred, updates[2].bytes_total);
}

#[tokio::test]
async fn cancelled_download_returns_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(CollectingProgressSink::new());
    let (ctx, signal) = context(dir.path(), Arc::clone(&progress));
    let sim = SimulatorContentHandler::new(SimulatorScript {
        step_delay: Duration::from_secs(30),
        ..SimulatorScript::default()
    });

    signal.cancel(CancellationType::Normal);
    let result = sim.download(&ctx).await;

    assert!(result.is_cancelled());
    assert_eq!(progress.last().unwrap().state, DownloadState::Cancelled);
}

#[tokio::test]
async fn scripted_failure_is_returned_and_not_installed() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path(), Arc::new(CollectingProgressSink::new()));
    let sim = SimulatorContentHandler::new(SimulatorScript {
        apply: UpdateResult::failure(erc::COMPONENT_FAILED),
        ..fast_script()
    });

    assert!(sim.apply(&ctx).await.is_failure());
    assert_eq!(
        sim.is_installed(&ctx).await.result_code,
        code::IS_INSTALLED_NOT_INSTALLED
    );
}
