// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase execution: start, worker dispatch, completion and reboot handling

use super::super::{persistence_failure, Runtime};
use crate::document::Report;
use crate::error::EngineError;
use ota_adapters::{ContentHandler, DeviceControl, ReportSink, WorkflowContext};
use ota_core::{
    code, erc, AgentRestartState, CancellationType, ComponentUpdate, Event, Phase, ResultTree,
    Step, StepOutcome, SystemRebootState, TreeError, UpdateResult, UpdateState, WorkflowHandle,
    WorkflowId,
};
use ota_storage::SnapshotWriter;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Where a workflow picks up from a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResumePoint {
    Phase(Phase),
    /// Apply already succeeded; only the idle report is left.
    IdleReport,
    Nothing,
}

/// `XStarted` re-runs X; `XSucceeded` moves on to the next phase.
pub(crate) fn resume_point(state: UpdateState) -> ResumePoint {
    match state {
        UpdateState::Idle | UpdateState::DownloadStarted => ResumePoint::Phase(Phase::Download),
        UpdateState::DownloadSucceeded | UpdateState::InstallStarted => {
            ResumePoint::Phase(Phase::Install)
        }
        UpdateState::InstallSucceeded | UpdateState::ApplyStarted => {
            ResumePoint::Phase(Phase::Apply)
        }
        UpdateState::ApplySucceeded => ResumePoint::IdleReport,
        UpdateState::Failed => ResumePoint::Nothing,
    }
}

impl<H, T, D, W> Runtime<H, T, D, W>
where
    H: ContentHandler,
    T: ReportSink,
    D: DeviceControl,
    W: SnapshotWriter,
{
    /// Enter `phase`: record `XStarted` durably, report it, then run it.
    pub(crate) async fn begin_phase(&mut self, phase: Phase) -> Result<(), EngineError> {
        let Some(live) = self.slot.live_mut() else {
            return Ok(());
        };
        live.handle_mut().set_state_and_result(
            phase.started_state(),
            UpdateResult::new(phase.in_progress_code()),
        );
        info!(workflow_id = %live.workflow_id(), %phase, "phase starting");

        if let Err(e) = self.persist() {
            return self.fail_workflow(persistence_failure(&e)).await;
        }
        self.report_live().await;
        self.spawn_step(Step::Phase(phase));
        Ok(())
    }

    /// Run `step` for the live workflow on a worker task.
    ///
    /// The first phase of an occupancy creates the sandbox before running.
    pub(crate) fn spawn_step(&mut self, step: Step) {
        let Some(workflow_id) = self.slot.live().map(|l| l.workflow_id().clone()) else {
            return;
        };
        let work_dir = self.work_dir(&workflow_id);
        let progress = Arc::clone(&self.progress);
        let Some(live) = self.slot.live_mut() else {
            return;
        };
        let create_sandbox = matches!(step, Step::Phase(_)) && !live.sandbox_ready();
        if create_sandbox {
            live.mark_sandbox_ready();
        }
        live.handle_mut().set_operation_in_progress(true);
        let ctx = live.context(work_dir, progress);
        let generation = live.generation();
        let content = self.content.clone();
        let event_tx = self.event_tx.clone();
        debug!(%workflow_id, generation, %step, create_sandbox, "dispatching step");

        let span = info_span!("step", %workflow_id, generation, %step);
        let worker = tokio::spawn(
            async move { execute_step(&content, &ctx, step, create_sandbox).await }.instrument(span),
        );
        tokio::spawn(async move {
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(%workflow_id, %step, error = %e, "step worker lost");
                    StepOutcome::new(
                        UpdateResult::failure(erc::WORKER_LOST).with_details(e.to_string()),
                    )
                }
            };
            let event = Event::StepCompleted {
                workflow_id,
                generation,
                step,
                outcome,
            };
            if event_tx.send(event).await.is_err() {
                debug!("runtime gone, dropping step completion");
            }
        });
    }

    /// A worker returned. The cancellation recorded at this moment decides
    /// what happens next.
    pub(crate) async fn handle_step_completed(
        &mut self,
        workflow_id: &WorkflowId,
        generation: u64,
        step: Step,
        outcome: StepOutcome,
    ) -> Result<(), EngineError> {
        let Some(live) = self.slot.live_at(workflow_id, generation) else {
            debug!(%workflow_id, generation, %step, "completion for a workflow no longer live");
            return Ok(());
        };
        live.handle_mut().set_operation_in_progress(false);
        let cancellation = live.handle().cancellation_type();
        info!(%workflow_id, %step, result = %outcome.result, "step completed");

        if cancellation != CancellationType::None {
            return self.finish_cancelled(cancellation).await;
        }
        match step {
            Step::IsInstalled => self.on_installed_check(outcome).await,
            Step::Phase(phase) => self.on_phase_completed(phase, outcome).await,
        }
    }

    async fn on_installed_check(&mut self, outcome: StepOutcome) -> Result<(), EngineError> {
        if outcome.result.result_code == code::IS_INSTALLED_INSTALLED {
            info!("update already installed, skipping deployment");
            return self.finish_apply().await;
        }
        if outcome.result.is_failure() {
            warn!(result = %outcome.result, "installed check failed, deploying anyway");
        }
        self.begin_phase(Phase::Download).await
    }

    async fn on_phase_completed(
        &mut self,
        phase: Phase,
        outcome: StepOutcome,
    ) -> Result<(), EngineError> {
        let wants_reboot = outcome.wants_reboot();
        let wants_restart = !wants_reboot && outcome.wants_restart();
        let target = {
            let Some(live) = self.slot.live_mut() else {
                return Ok(());
            };
            let handle = live.handle_mut();
            if let Err(e) = merge_components(handle.results_mut(), &outcome.components) {
                let failure =
                    UpdateResult::failure(erc::INVALID_COMPONENT_PATH).with_details(e.to_string());
                return self.fail_workflow(failure).await;
            }
            let effective = effective_result(handle, &outcome.result);
            if effective.is_failure() {
                return self.fail_workflow(effective).await;
            }
            handle.set_state_and_result(phase.succeeded_state(), effective);
            if wants_reboot {
                handle.set_system_reboot_state(SystemRebootState::Required);
            }
            if wants_restart {
                handle.set_agent_restart_state(AgentRestartState::Required);
            }
            handle.target_phase()
        };

        if let Err(e) = self.persist() {
            return self.fail_workflow(persistence_failure(&e)).await;
        }
        if wants_reboot || wants_restart {
            return self.suspend_for_device(wants_reboot).await;
        }
        if phase == Phase::Apply {
            return self.finish_apply().await;
        }
        self.report_live().await;

        if target == Some(phase) {
            info!(%phase, "reached requested phase, waiting for next instruction");
            return Ok(());
        }
        match phase.next() {
            Some(next) => self.begin_phase(next).await,
            None => Ok(()),
        }
    }

    /// Report, trigger the reboot or restart, and park the workflow.
    ///
    /// The sequence resumes from the snapshot on the next start.
    async fn suspend_for_device(&mut self, reboot: bool) -> Result<(), EngineError> {
        self.report_live().await;
        let triggered = if reboot {
            self.device.reboot().await
        } else {
            self.device.restart_agent().await
        };
        if let Err(e) = triggered {
            let failure =
                UpdateResult::failure(erc::DEVICE_CONTROL_FAILED).with_details(e.to_string());
            return self.fail_workflow(failure).await;
        }

        let Some(live) = self.slot.live_mut() else {
            return Ok(());
        };
        let handle = live.handle_mut();
        if reboot {
            handle.set_system_reboot_state(SystemRebootState::InProgress);
        } else {
            handle.set_agent_restart_state(AgentRestartState::InProgress);
        }
        info!(workflow_id = %live.workflow_id(), reboot, "workflow suspended for device action");
        if let Err(e) = self.persist() {
            warn!(error = %e, "could not record device action in progress");
        }
        Ok(())
    }

    /// Apply succeeded (or the update was already installed): report idle
    /// with the installed update id and tear down.
    pub(crate) async fn finish_apply(&mut self) -> Result<(), EngineError> {
        let Some(live) = self.slot.live_mut() else {
            return Ok(());
        };
        let workflow_id = live.workflow_id().clone();
        let update_id = live.handle().instruction().expected_update_id().cloned();
        live.handle_mut()
            .set_state_and_result(UpdateState::Idle, UpdateResult::new(code::APPLY_SUCCESS));

        match update_id {
            Some(update_id) => {
                self.send_report(&workflow_id, Report::idle_with_update_id(update_id))
                    .await
            }
            None => self.report_live().await,
        }
        info!(%workflow_id, "deployment complete");
        self.teardown().await;
        Ok(())
    }
}

async fn execute_step<H: ContentHandler>(
    content: &H,
    ctx: &WorkflowContext,
    step: Step,
    create_sandbox: bool,
) -> StepOutcome {
    if create_sandbox {
        let created = content.sandbox_create(ctx).await;
        if created.is_failure() {
            return ctx.finish_step(
                UpdateResult::failure(erc::SANDBOX_CREATE_FAILED).with_details(created.to_string()),
            );
        }
    }
    let result = match step {
        Step::IsInstalled => content.is_installed(ctx).await,
        Step::Phase(Phase::Download) => content.download(ctx).await,
        Step::Phase(Phase::Install) => content.install(ctx).await,
        Step::Phase(Phase::Apply) => content.apply(ctx).await,
    };
    ctx.finish_step(result)
}

/// Write component results into the tree, linking new components.
fn merge_components(tree: &mut ResultTree, components: &[ComponentUpdate]) -> Result<(), TreeError> {
    for component in components {
        if !tree.is_linked(&component.path) {
            tree.add_child(&component.parent, &component.path)?;
        }
        tree.upsert(&component.path, component.result.clone(), component.state)?;
    }
    Ok(())
}

/// A failed phase, or else a failure anywhere in the tree, fails the phase.
fn effective_result(handle: &WorkflowHandle, phase_result: &UpdateResult) -> UpdateResult {
    if phase_result.is_failure() {
        return phase_result.clone();
    }
    match handle.aggregate_result() {
        Ok(aggregate) if aggregate.is_failure() => aggregate,
        _ => phase_result.clone(),
    }
}

#[cfg(test)]
#[path = "phases_tests.rs"]
mod tests;
