// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud-facing report documents.
//!
//! Consumers diff these byte-for-byte, so every field is emitted from a
//! typed struct in a fixed order rather than through a map.

use ota_core::{code, UpdateAction, UpdateId, UpdateResult, UpdateState, WorkflowId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace the agent reports under unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "deviceUpdate";

/// Longest `resultDetails` carried in a report, in bytes.
pub const MAX_RESULT_DETAILS: usize = 1024;

/// Component marker, always the first key under the namespace.
const COMPONENT_MARKER: &str = "c";

/// Placement of `workflow` (and `installedUpdateId`) in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportShape {
    /// Inside `agent`, after `state`.
    #[default]
    Nested,
    /// Next to `agent`, inside the namespace object.
    Sibling,
}

impl fmt::Display for ReportShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportShape::Nested => f.write_str("nested"),
            ReportShape::Sibling => f.write_str("sibling"),
        }
    }
}

/// One state report for a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub state: UpdateState,
    pub result: UpdateResult,
    /// Stamped only on the idle report that follows a successful apply.
    pub installed_update_id: Option<UpdateId>,
}

impl Report {
    pub fn new(state: UpdateState, result: UpdateResult) -> Self {
        Self {
            state,
            result,
            installed_update_id: None,
        }
    }

    /// Idle report announcing the now-installed update.
    pub fn idle_with_update_id(update_id: UpdateId) -> Self {
        Self {
            state: UpdateState::Idle,
            result: UpdateResult::new(code::APPLY_SUCCESS),
            installed_update_id: Some(update_id),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallResultDoc<'a> {
    result_code: i32,
    extended_result_code: i32,
    result_details: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LastInstallResultDoc<'a> {
    update_install_result: InstallResultDoc<'a>,
}

#[derive(Serialize)]
struct WorkflowDoc<'a> {
    action: u8,
    id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NestedAgentDoc<'a> {
    last_install_result: LastInstallResultDoc<'a>,
    state: u8,
    workflow: WorkflowDoc<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed_update_id: Option<String>,
}

#[derive(Serialize)]
struct NestedDoc<'a> {
    #[serde(rename = "__t")]
    marker: &'static str,
    agent: NestedAgentDoc<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiblingAgentDoc<'a> {
    last_install_result: LastInstallResultDoc<'a>,
    state: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiblingDoc<'a> {
    #[serde(rename = "__t")]
    marker: &'static str,
    agent: SiblingAgentDoc<'a>,
    workflow: WorkflowDoc<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed_update_id: Option<String>,
}

/// Serializes [`Report`]s in the configured shape and namespace.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    shape: ReportShape,
    namespace: String,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(ReportShape::default(), DEFAULT_NAMESPACE)
    }
}

impl DocumentBuilder {
    pub fn new(shape: ReportShape, namespace: impl Into<String>) -> Self {
        Self {
            shape,
            namespace: namespace.into(),
        }
    }

    pub fn shape(&self) -> ReportShape {
        self.shape
    }

    pub fn build(
        &self,
        workflow_id: &WorkflowId,
        report: &Report,
    ) -> Result<Vec<u8>, serde_json::Error> {
        let last_install_result = LastInstallResultDoc {
            update_install_result: InstallResultDoc {
                result_code: report.result.result_code,
                extended_result_code: report.result.extended_result_code,
                result_details: truncate_details(&report.result.result_details),
            },
        };
        // Every accepted instruction is reported as part of a deployment.
        let workflow = WorkflowDoc {
            action: UpdateAction::ProcessDeployment.into(),
            id: workflow_id.as_str(),
        };
        let state = u8::from(report.state);
        let installed_update_id = report
            .installed_update_id
            .as_ref()
            .map(UpdateId::to_compact_json);

        match self.shape {
            ReportShape::Nested => self.wrap(NestedDoc {
                marker: COMPONENT_MARKER,
                agent: NestedAgentDoc {
                    last_install_result,
                    state,
                    workflow,
                    installed_update_id,
                },
            }),
            ReportShape::Sibling => self.wrap(SiblingDoc {
                marker: COMPONENT_MARKER,
                agent: SiblingAgentDoc {
                    last_install_result,
                    state,
                },
                workflow,
                installed_update_id,
            }),
        }
    }

    fn wrap<B: Serialize>(&self, body: B) -> Result<Vec<u8>, serde_json::Error> {
        let mut document = BTreeMap::new();
        document.insert(self.namespace.as_str(), body);
        serde_json::to_vec(&document)
    }
}

/// Cut `details` to at most [`MAX_RESULT_DETAILS`] bytes on a char boundary.
fn truncate_details(details: &str) -> &str {
    if details.len() <= MAX_RESULT_DETAILS {
        return details;
    }
    let mut end = MAX_RESULT_DETAILS;
    while !details.is_char_boundary(end) {
        end -= 1;
    }
    &details[..end]
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
