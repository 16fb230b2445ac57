// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ota_core::test_support::InstructionBuilder;

fn handle(id: &str) -> WorkflowHandle {
    WorkflowHandle::parse(&InstructionBuilder::new(id).build()).unwrap()
}

#[test]
fn second_occupant_is_refused_while_live() {
    let mut slot = WorkflowSlot::new();
    slot.occupy(handle("a")).unwrap();

    let err = slot.occupy(handle("b")).unwrap_err();
    assert!(matches!(err, EngineError::Busy(id) if id == "a"));
    assert_eq!(slot.live().unwrap().workflow_id(), "a");
}

#[test]
fn release_frees_the_slot_and_bumps_generation() {
    let mut slot = WorkflowSlot::new();
    let first = slot.occupy(handle("a")).unwrap().generation();
    assert!(slot.release().is_some());
    assert!(slot.is_idle());

    let second = slot.occupy(handle("a")).unwrap().generation();
    assert!(second > first);
}

#[test]
fn live_at_filters_stale_generations() {
    let mut slot = WorkflowSlot::new();
    let generation = slot.occupy(handle("a")).unwrap().generation();

    assert!(slot.live_at(&WorkflowId::new("a"), generation).is_some());
    assert!(slot.live_at(&WorkflowId::new("a"), generation + 1).is_none());
    assert!(slot.live_at(&WorkflowId::new("b"), generation).is_none());
}

#[test]
fn newest_pending_handle_wins() {
    let mut slot = WorkflowSlot::new();
    assert!(slot.set_pending(handle("b")).is_none());
    let displaced = slot.set_pending(handle("c")).unwrap();
    assert_eq!(displaced.workflow_id(), "b");
    assert_eq!(slot.take_pending().unwrap().workflow_id(), "c");
    assert!(slot.pending().is_none());
}

#[test]
fn cancel_request_is_visible_on_handle() {
    let mut slot = WorkflowSlot::new();
    let live = slot.occupy(handle("a")).unwrap();
    live.request_cancel(CancellationType::Retry);
    assert_eq!(live.handle().cancellation_type(), CancellationType::Retry);
}
