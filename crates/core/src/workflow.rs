// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow handle: one parsed deployment instruction plus its runtime state.

use crate::id::{FileId, WorkflowId};
use crate::manifest::{ContentData, FileEntity, RawManifest, UpdateId, UpdateType};
use crate::result::UpdateResult;
use crate::result_tree::{ResultTree, TreeError, ROOT_PATH};
use crate::state::{
    AgentRestartState, CancellationType, Phase, SystemRebootState, UpdateAction, UpdateState,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed instruction: {0}")]
    MalformedInstruction(String),
}

fn malformed(reason: impl Into<String>) -> ParseError {
    ParseError::MalformedInstruction(reason.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstruction {
    #[serde(default)]
    update_manifest: Option<String>,
    #[serde(default)]
    update_manifest_signature: Option<String>,
    workflow: Option<RawWorkflow>,
    #[serde(default)]
    file_urls: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkflow {
    id: Option<String>,
    action: Option<i64>,
    #[serde(default)]
    retry_timestamp: Option<String>,
}

/// The immutable half of a workflow: what the cloud asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    workflow_id: WorkflowId,
    action: UpdateAction,
    retry_token: Option<String>,
    signature: Option<String>,
    content: Option<ContentData>,
    raw: String,
}

impl Instruction {
    /// Parse and validate a cloud instruction.
    ///
    /// Signatures are carried through untouched; verifying them is the
    /// content handler's business.
    pub fn parse(payload: &str) -> Result<Self, ParseError> {
        let raw: RawInstruction =
            serde_json::from_str(payload).map_err(|e| malformed(format!("not json: {e}")))?;
        let workflow = raw.workflow.ok_or_else(|| malformed("missing workflow"))?;
        let workflow_id = workflow
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("missing workflow.id"))?;
        let action = workflow
            .action
            .ok_or_else(|| malformed("missing workflow.action"))?;
        let action = u8::try_from(action)
            .ok()
            .and_then(|a| UpdateAction::try_from(a).ok())
            .ok_or_else(|| malformed(format!("unknown workflow.action {action}")))?;

        let content = if action.is_cancel() {
            None
        } else {
            let manifest = raw
                .update_manifest
                .as_deref()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| malformed("missing updateManifest"))?;
            Some(parse_content(manifest, &raw.file_urls)?)
        };

        Ok(Self {
            workflow_id: WorkflowId::new(workflow_id),
            action,
            retry_token: workflow.retry_timestamp.filter(|t| !t.is_empty()),
            signature: raw.update_manifest_signature,
            content,
            raw: payload.to_string(),
        })
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn action(&self) -> UpdateAction {
        self.action
    }

    pub fn is_cancel_request(&self) -> bool {
        self.action.is_cancel()
    }

    pub fn retry_token(&self) -> Option<&str> {
        self.retry_token.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Parsed manifest; absent only for cancel requests.
    pub fn content(&self) -> Option<&ContentData> {
        self.content.as_ref()
    }

    pub fn expected_update_id(&self) -> Option<&UpdateId> {
        self.content.as_ref().map(|c| &c.expected_update_id)
    }

    /// The instruction text exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn parse_content(
    manifest: &str,
    file_urls: &BTreeMap<String, String>,
) -> Result<ContentData, ParseError> {
    let manifest: RawManifest = serde_json::from_str(manifest)
        .map_err(|e| malformed(format!("bad updateManifest: {e}")))?;
    let expected_update_id = manifest
        .update_id
        .ok_or_else(|| malformed("manifest has no updateId"))?;
    let update_type = manifest
        .update_type
        .as_deref()
        .and_then(UpdateType::parse)
        .ok_or_else(|| malformed("manifest updateType missing or unversioned"))?;
    let installed_criteria = manifest
        .installed_criteria
        .filter(|c| !c.is_empty())
        .ok_or_else(|| malformed("manifest has no installedCriteria"))?;

    let mut files = Vec::with_capacity(manifest.files.len());
    for (file_id, file) in manifest.files {
        if file.hashes.is_empty() {
            return Err(malformed(format!("file {file_id} declares no hashes")));
        }
        let download_uri = file_urls
            .get(&file_id)
            .cloned()
            .ok_or_else(|| malformed(format!("file {file_id} has no url")))?;
        files.push(FileEntity {
            file_id: FileId::new(file_id),
            file_name: file.file_name,
            size_in_bytes: file.size_in_bytes,
            hashes: file.hashes,
            download_uri,
        });
    }

    Ok(ContentData {
        manifest_version: manifest.manifest_version,
        expected_update_id,
        installed_criteria,
        update_type,
        files,
        created_date_time: manifest.created_date_time,
    })
}

/// Cancellation request shared between intake and a running phase.
///
/// A single atomic cell so a phase polling it always sees the latest write.
#[derive(Debug, Default)]
pub struct CancellationFlag(AtomicU8);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, kind: CancellationType) {
        self.0.store(kind.into(), Ordering::SeqCst);
    }

    pub fn get(&self) -> CancellationType {
        CancellationType::try_from(self.0.load(Ordering::SeqCst)).unwrap_or_default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.get() != CancellationType::None
    }

    pub fn clear(&self) {
        self.set(CancellationType::None);
    }
}

/// A parsed instruction plus the mutable state of driving it.
#[derive(Debug)]
pub struct WorkflowHandle {
    instruction: Instruction,
    state: UpdateState,
    cancellation: Arc<CancellationFlag>,
    operation_in_progress: bool,
    system_reboot: SystemRebootState,
    agent_restart: AgentRestartState,
    results: ResultTree,
}

impl WorkflowHandle {
    pub fn parse(payload: &str) -> Result<Self, ParseError> {
        Instruction::parse(payload).map(Self::from_instruction)
    }

    pub fn from_instruction(instruction: Instruction) -> Self {
        Self {
            instruction,
            state: UpdateState::Idle,
            cancellation: Arc::new(CancellationFlag::new()),
            operation_in_progress: false,
            system_reboot: SystemRebootState::None,
            agent_restart: AgentRestartState::None,
            results: ResultTree::new(),
        }
    }

    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    pub fn into_instruction(self) -> Instruction {
        self.instruction
    }

    /// Adopt a follow-up instruction for the same workflow, keeping the
    /// state, results and cancellation flag driven so far.
    pub fn adopt_instruction(&mut self, instruction: Instruction) {
        self.instruction = instruction;
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        self.instruction.workflow_id()
    }

    pub fn action(&self) -> UpdateAction {
        self.instruction.action()
    }

    pub fn is_cancel_request(&self) -> bool {
        self.instruction.is_cancel_request()
    }

    pub fn retry_token(&self) -> Option<&str> {
        self.instruction.retry_token()
    }

    /// Last phase this workflow's instruction asks for.
    pub fn target_phase(&self) -> Option<Phase> {
        self.action().target_phase()
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Move to `state`, mirroring it onto the root node.
    pub fn set_state(&mut self, state: UpdateState) {
        self.state = state;
        // Root always exists.
        let _ = self.results.set_state(ROOT_PATH, state);
    }

    /// Move to `state` and record `result` on the root node.
    pub fn set_state_and_result(&mut self, state: UpdateState, result: UpdateResult) {
        self.state = state;
        let _ = self.results.upsert(ROOT_PATH, result, state);
    }

    pub fn cancellation_type(&self) -> CancellationType {
        self.cancellation.get()
    }

    pub fn request_cancel(&self, kind: CancellationType) {
        self.cancellation.set(kind);
    }

    /// Shared flag handed to phase workers.
    pub fn cancellation(&self) -> Arc<CancellationFlag> {
        Arc::clone(&self.cancellation)
    }

    pub fn operation_in_progress(&self) -> bool {
        self.operation_in_progress
    }

    pub fn set_operation_in_progress(&mut self, in_progress: bool) {
        self.operation_in_progress = in_progress;
    }

    pub fn system_reboot_state(&self) -> SystemRebootState {
        self.system_reboot
    }

    pub fn set_system_reboot_state(&mut self, state: SystemRebootState) {
        self.system_reboot = state;
    }

    pub fn agent_restart_state(&self) -> AgentRestartState {
        self.agent_restart
    }

    pub fn set_agent_restart_state(&mut self, state: AgentRestartState) {
        self.agent_restart = state;
    }

    pub fn results(&self) -> &ResultTree {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut ResultTree {
        &mut self.results
    }

    /// Replace the result tree, e.g. with one restored from a snapshot.
    pub fn restore_results(&mut self, results: ResultTree) {
        self.results = results;
    }

    /// Effective result of the whole deployment.
    pub fn aggregate_result(&self) -> Result<UpdateResult, TreeError> {
        self.results.aggregate(ROOT_PATH)
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
