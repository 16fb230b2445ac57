// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration file.
//!
//! Loaded once at startup. The runtime never reads it again, so every value
//! it needs is copied into [`RuntimeConfig`] up front.

use ota_engine::{ReportShape, RuntimeConfig, DEFAULT_NAMESPACE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Device identity and policy supplied by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub schema_version: String,
    /// Users allowed to run installer plugins.
    #[serde(default)]
    pub adu_shell_trusted_users: Vec<String>,
    pub manufacturer: String,
    pub model: String,
    pub agents: Vec<AgentEntry>,
    /// Test hook: report the device as unhealthy.
    #[serde(default)]
    pub simulate_unhealthy_state: bool,
    /// CA bundle for connections through an edge gateway.
    #[serde(default)]
    pub edgegateway_cert_path: Option<String>,
    #[serde(default)]
    pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEntry {
    pub name: String,
    pub runas: String,
    pub connection_type: String,
    pub connection_data: String,
    pub manufacturer: String,
    pub model: String,
}

/// Workflow policy knobs; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSettings {
    pub report_shape: ReportShape,
    pub namespace: String,
    pub persistence_attempts: u32,
    pub report_retry_seconds: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        let defaults = RuntimeConfig::new(PathBuf::new());
        Self {
            report_shape: defaults.report_shape,
            namespace: DEFAULT_NAMESPACE.to_string(),
            persistence_attempts: defaults.persistence_attempts,
            report_retry_seconds: defaults.report_retry_interval.as_secs(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.is_empty() {
            return Err(ConfigError::Invalid("no agents configured".into()));
        }
        if let Some(i) = self.agents.iter().position(|a| a.name.is_empty()) {
            return Err(ConfigError::Invalid(format!("agents[{i}] has no name")));
        }
        if self.workflow.persistence_attempts == 0 {
            return Err(ConfigError::Invalid(
                "workflow.persistenceAttempts must be at least 1".into(),
            ));
        }
        if self.workflow.namespace.is_empty() {
            return Err(ConfigError::Invalid("workflow.namespace is empty".into()));
        }
        Ok(())
    }

    /// The agent this daemon runs as. Only the first entry is driven.
    pub fn agent(&self) -> Option<&AgentEntry> {
        self.agents.first()
    }

    pub fn runtime_config(&self, state_dir: impl Into<PathBuf>) -> RuntimeConfig {
        let mut config = RuntimeConfig::new(state_dir);
        config.report_shape = self.workflow.report_shape;
        config.namespace = self.workflow.namespace.clone();
        config.persistence_attempts = self.workflow.persistence_attempts;
        config.report_retry_interval = Duration::from_secs(self.workflow.report_retry_seconds.max(1));
        config
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
