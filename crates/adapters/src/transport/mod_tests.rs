// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn completion(seq: u64) -> (ReportCompletion, mpsc::UnboundedReceiver<ReportAck>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReportCompletion::new(WorkflowId::new("wf"), seq, tx), rx)
}

#[test]
fn complete_sends_one_ack() {
    let (c, mut rx) = completion(4);
    assert_eq!(c.seq(), 4);
    c.complete(true);

    assert_eq!(
        rx.try_recv().unwrap(),
        ReportAck {
            workflow_id: WorkflowId::new("wf"),
            seq: 4,
            accepted: true,
        }
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn dropped_completion_is_a_rejection() {
    let (c, mut rx) = completion(9);
    drop(c);
    let ack = rx.try_recv().unwrap();
    assert_eq!(ack.seq, 9);
    assert!(!ack.accepted);
    assert!(rx.try_recv().is_err());
}

#[test]
fn completion_tolerates_closed_channel() {
    let (c, rx) = completion(1);
    drop(rx);
    c.complete(true);
}

#[tokio::test]
async fn log_sink_acknowledges_immediately() {
    let (c, mut rx) = completion(2);
    LogReportSink::new()
        .send(br#"{"deviceUpdate":{}}"#.to_vec(), c)
        .await
        .unwrap();
    assert!(rx.try_recv().unwrap().accepted);
}
