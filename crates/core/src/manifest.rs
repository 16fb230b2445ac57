// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Update manifest types.
//!
//! The manifest arrives as a JSON document embedded (as a string) inside the
//! cloud instruction. Only the fields the orchestrator needs are modelled;
//! signature verification and schema validation belong to other components.

use crate::id::FileId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of an update: `{provider, name, version}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateId {
    pub provider: String,
    pub name: String,
    pub version: String,
}

impl UpdateId {
    pub fn new(
        provider: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Compact JSON form, field order `provider, name, version`.
    ///
    /// This is the exact string stamped into `installedUpdateId`.
    pub fn to_compact_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.provider, self.name, self.version)
    }
}

/// `updateType` split into handler name and version, e.g. `microsoft/bundle:1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateType {
    pub name: String,
    pub version: u32,
}

impl UpdateType {
    /// Parse `"<provider>/<name>:<version>"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, version) = raw.rsplit_once(':')?;
        if name.is_empty() || !name.contains('/') {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            version: version.parse().ok()?,
        })
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// One file declared by the manifest, joined with its download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntity {
    pub file_id: FileId,
    pub file_name: String,
    pub size_in_bytes: u64,
    /// Algorithm name to encoded digest (e.g. `sha256` to base64).
    pub hashes: BTreeMap<String, String>,
    pub download_uri: String,
}

/// Raw manifest document, as embedded in the instruction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawManifest {
    #[serde(default)]
    pub manifest_version: Option<String>,
    pub update_id: Option<UpdateId>,
    pub update_type: Option<String>,
    pub installed_criteria: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, RawFile>,
    #[serde(default)]
    pub created_date_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFile {
    pub file_name: String,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
}

/// Parsed content description of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentData {
    pub manifest_version: Option<String>,
    pub expected_update_id: UpdateId,
    pub installed_criteria: String,
    pub update_type: UpdateType,
    pub files: Vec<FileEntity>,
    pub created_date_time: Option<String>,
}

impl ContentData {
    pub fn file(&self, id: &str) -> Option<&FileEntity> {
        self.files.iter().find(|f| f.file_id == id)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
