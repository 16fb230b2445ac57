// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::state::UpdateAction;
use serde_json::{json, Map, Value};

pub const BUNDLE_WORKFLOW_ID: &str = "action_bundle";

/// Builds instruction payloads in the cloud's wire format.
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    workflow_id: String,
    action: u8,
    retry_token: Option<String>,
    update_id: (String, String, String),
    update_type: String,
    installed_criteria: String,
    files: Vec<(String, String, String)>,
    omit_url_for: Option<String>,
}

impl InstructionBuilder {
    pub fn new(workflow_id: &str) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            action: UpdateAction::ProcessDeployment.into(),
            retry_token: None,
            update_id: ("Microsoft".into(), "adu".into(), "1.2.3.4".into()),
            update_type: "microsoft/bundle:1".into(),
            installed_criteria: "1.2.3.4".into(),
            files: vec![(
                "f0".into(),
                "bundle.manifest.json".into(),
                "8nYl3zGxmz6Dx1EMUGe2JEzYydfxPqCGIYMMwX4oA4s=".into(),
            )],
            omit_url_for: None,
        }
    }

    pub fn action(mut self, action: UpdateAction) -> Self {
        self.action = action.into();
        self
    }

    /// Raw action code, for exercising unknown values.
    pub fn action_code(mut self, code: u8) -> Self {
        self.action = code;
        self
    }

    pub fn retry(mut self, token: &str) -> Self {
        self.retry_token = Some(token.to_string());
        self
    }

    pub fn update_id(mut self, provider: &str, name: &str, version: &str) -> Self {
        self.update_id = (provider.into(), name.into(), version.into());
        self
    }

    pub fn update_type(mut self, update_type: &str) -> Self {
        self.update_type = update_type.to_string();
        self
    }

    pub fn file(mut self, id: &str, name: &str, sha256: &str) -> Self {
        self.files.push((id.into(), name.into(), sha256.into()));
        self
    }

    pub fn without_url_for(mut self, id: &str) -> Self {
        self.omit_url_for = Some(id.to_string());
        self
    }

    pub fn manifest(&self) -> Value {
        let mut files = Map::new();
        for (id, name, hash) in &self.files {
            files.insert(
                id.clone(),
                json!({ "fileName": name, "sizeInBytes": 1024, "hashes": { "sha256": hash } }),
            );
        }
        json!({
            "manifestVersion": "4",
            "updateId": {
                "provider": self.update_id.0,
                "name": self.update_id.1,
                "version": self.update_id.2,
            },
            "updateType": self.update_type,
            "installedCriteria": self.installed_criteria,
            "files": files,
            "createdDateTime": "2022-01-27T13:45:05.8993329Z",
        })
    }

    pub fn to_value(&self) -> Value {
        let mut workflow = json!({ "action": self.action, "id": self.workflow_id });
        if let Some(token) = &self.retry_token {
            workflow["retryTimestamp"] = json!(token);
        }
        let is_cancel = self.action == u8::from(UpdateAction::Cancel);
        let mut urls = Map::new();
        if !is_cancel {
            for (id, name, _) in &self.files {
                if self.omit_url_for.as_deref() == Some(id.as_str()) {
                    continue;
                }
                urls.insert(id.clone(), json!(format!("http://updates.local/{name}")));
            }
        }
        json!({
            "updateManifest": if is_cancel { String::new() } else { self.manifest().to_string() },
            "updateManifestSignature": "eyJhbGciOiJSUzI1NiJ9.e30.c2ln",
            "workflow": workflow,
            "fileUrls": urls,
        })
    }

    pub fn build(&self) -> String {
        self.to_value().to_string()
    }
}

/// The bundle deployment used throughout the end-to-end scenarios.
pub fn bundle_instruction(action: UpdateAction) -> String {
    InstructionBuilder::new(BUNDLE_WORKFLOW_ID)
        .action(action)
        .build()
}

pub fn cancel_instruction(workflow_id: &str) -> String {
    InstructionBuilder::new(workflow_id)
        .action(UpdateAction::Cancel)
        .build()
}
