// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reporting gateway: deduplicated, sequenced delivery of report documents.
//!
//! Per workflow there is at most one send in flight. A newer report waits as
//! `pending` (newest wins) until the in-flight one is acknowledged. "Last
//! sent" only moves when an acknowledgement with the in-flight sequence
//! number arrives, so a late ack for a superseded send changes nothing.

use crate::document::{DocumentBuilder, Report};
use crate::error::EngineError;
use ota_adapters::{ReportAck, ReportCompletion, ReportSink};
use ota_core::{UpdateId, UpdateResult, UpdateState, WorkflowId};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What happened to a submitted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Handed to the sink with this sequence number.
    Sent(u64),
    /// Waiting behind an in-flight send.
    Queued,
    /// Identical to the newest document already sent or queued.
    Skipped,
}

#[derive(Debug, Clone)]
struct Outgoing {
    doc: Vec<u8>,
    state: UpdateState,
}

#[derive(Debug)]
struct InFlight {
    seq: u64,
    report: Outgoing,
}

#[derive(Debug, Default)]
struct Channel {
    last_sent: Option<Outgoing>,
    in_flight: Option<InFlight>,
    pending: Option<Outgoing>,
    /// Rejected document awaiting a resend.
    retry: Option<Outgoing>,
}

impl Channel {
    fn is_duplicate(&self, doc: &[u8]) -> bool {
        if let Some(pending) = &self.pending {
            return pending.doc == doc;
        }
        if let Some(flight) = &self.in_flight {
            return flight.report.doc == doc;
        }
        if self.retry.is_some() {
            return false;
        }
        self.last_sent.as_ref().is_some_and(|sent| sent.doc == doc)
    }

    fn is_settled(&self) -> bool {
        self.in_flight.is_none() && self.pending.is_none() && self.retry.is_none()
    }
}

pub struct ReportingGateway<T> {
    sink: T,
    builder: DocumentBuilder,
    ack_tx: mpsc::UnboundedSender<ReportAck>,
    next_seq: u64,
    channels: HashMap<WorkflowId, Channel>,
}

impl<T: ReportSink> ReportingGateway<T> {
    /// Acknowledgements for every send arrive on `ack_tx`'s receiver and
    /// must be fed back through [`handle_ack`](Self::handle_ack).
    pub fn new(sink: T, builder: DocumentBuilder, ack_tx: mpsc::UnboundedSender<ReportAck>) -> Self {
        Self {
            sink,
            builder,
            ack_tx,
            next_seq: 0,
            channels: HashMap::new(),
        }
    }

    pub async fn report_state_and_result(
        &mut self,
        workflow_id: &WorkflowId,
        state: UpdateState,
        result: UpdateResult,
    ) -> Result<Submission, EngineError> {
        self.submit(workflow_id, Report::new(state, result)).await
    }

    /// Terminal idle report stamping the now-installed update.
    pub async fn report_update_id_and_idle(
        &mut self,
        workflow_id: &WorkflowId,
        update_id: UpdateId,
    ) -> Result<Submission, EngineError> {
        self.submit(workflow_id, Report::idle_with_update_id(update_id))
            .await
    }

    /// Send `report` unless it repeats the newest outstanding document.
    ///
    /// A synchronous transport refusal returns [`EngineError::Transport`];
    /// the document is kept and resent on the next report or retry tick.
    pub async fn submit(
        &mut self,
        workflow_id: &WorkflowId,
        report: Report,
    ) -> Result<Submission, EngineError> {
        let outgoing = Outgoing {
            doc: self.builder.build(workflow_id, &report)?,
            state: report.state,
        };
        let channel = self.channels.entry(workflow_id.clone()).or_default();
        if channel.is_duplicate(&outgoing.doc) {
            debug!(%workflow_id, state = %report.state, "report unchanged, skipping");
            return Ok(Submission::Skipped);
        }
        if let Some(flight) = &channel.in_flight {
            if flight.report.doc == outgoing.doc {
                // Back to what is already in flight; the queued report is stale.
                if channel.pending.take().is_some() {
                    debug!(%workflow_id, "dropped queued report, newest is in flight");
                }
                return Ok(Submission::Skipped);
            }
            if channel.pending.replace(outgoing).is_some() {
                debug!(%workflow_id, "superseded queued report");
            }
            return Ok(Submission::Queued);
        }
        if let Some(rejected) = channel.retry.take() {
            // Resend the rejected document first; a different new one follows it.
            if rejected.doc != outgoing.doc {
                channel.pending = Some(outgoing);
            }
            return self.dispatch(workflow_id, rejected).await;
        }
        self.dispatch(workflow_id, outgoing).await
    }

    async fn dispatch(
        &mut self,
        workflow_id: &WorkflowId,
        outgoing: Outgoing,
    ) -> Result<Submission, EngineError> {
        self.next_seq += 1;
        let seq = self.next_seq;
        let state = outgoing.state;
        let payload = outgoing.doc.clone();
        let completion = ReportCompletion::new(workflow_id.clone(), seq, self.ack_tx.clone());
        self.channels
            .entry(workflow_id.clone())
            .or_default()
            .in_flight = Some(InFlight {
            seq,
            report: outgoing,
        });

        match self.sink.send(payload, completion).await {
            Ok(()) => {
                debug!(%workflow_id, seq, %state, "report sent");
                Ok(Submission::Sent(seq))
            }
            Err(e) => {
                let channel = self.channels.entry(workflow_id.clone()).or_default();
                if let Some(flight) = channel.in_flight.take() {
                    channel.retry = Some(flight.report);
                }
                Err(e.into())
            }
        }
    }

    /// Apply a transport acknowledgement.
    ///
    /// Returns the acknowledged state when `ack` accepted the in-flight
    /// send. Stale acks are ignored. A queued report is sent next.
    pub async fn handle_ack(&mut self, ack: ReportAck) -> Option<UpdateState> {
        let channel = self.channels.get_mut(&ack.workflow_id)?;
        let in_flight_seq = channel.in_flight.as_ref().map(|f| f.seq);
        if in_flight_seq != Some(ack.seq) {
            debug!(
                workflow_id = %ack.workflow_id,
                seq = ack.seq,
                ?in_flight_seq,
                "stale report ack ignored",
            );
            return None;
        }
        let flight = channel.in_flight.take()?;

        let acked = if ack.accepted {
            let state = flight.report.state;
            channel.last_sent = Some(flight.report);
            Some(state)
        } else {
            warn!(workflow_id = %ack.workflow_id, seq = ack.seq, "report rejected by transport");
            if channel.pending.is_none() {
                channel.retry = Some(flight.report);
            }
            None
        };

        if let Some(next) = channel.pending.take() {
            if let Err(e) = self.dispatch(&ack.workflow_id, next).await {
                warn!(workflow_id = %ack.workflow_id, error = %e, "queued report held for retry");
            }
        }
        acked
    }

    /// Resend every rejected document that has nothing in flight.
    pub async fn retry_rejected(&mut self) -> usize {
        let waiting: Vec<WorkflowId> = self
            .channels
            .iter()
            .filter(|(_, c)| c.retry.is_some() && c.in_flight.is_none())
            .map(|(id, _)| id.clone())
            .collect();

        let mut resent = 0;
        for workflow_id in waiting {
            let Some(rejected) = self
                .channels
                .get_mut(&workflow_id)
                .and_then(|c| c.retry.take())
            else {
                continue;
            };
            match self.dispatch(&workflow_id, rejected).await {
                Ok(_) => resent += 1,
                Err(e) => warn!(%workflow_id, error = %e, "report retry refused"),
            }
        }
        if resent > 0 {
            info!(resent, "resent rejected reports");
        }
        resent
    }

    /// State of the last document the transport acknowledged.
    pub fn last_reported_state(&self, workflow_id: &WorkflowId) -> Option<UpdateState> {
        self.channels
            .get(workflow_id)?
            .last_sent
            .as_ref()
            .map(|sent| sent.state)
    }

    /// Whether anything for `workflow_id` is in flight, queued, or awaiting retry.
    pub fn has_outstanding(&self, workflow_id: &WorkflowId) -> bool {
        self.channels
            .get(workflow_id)
            .is_some_and(|c| !c.is_settled())
    }

    /// Forget workflows with nothing outstanding, except `keep`.
    pub fn prune_settled(&mut self, keep: &WorkflowId) {
        self.channels
            .retain(|id, channel| id == keep || !channel.is_settled());
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
