// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terraform state payload parsing (schema version 4).
//!
//! State blobs arrive base64-encoded from workers and are stored
//! verbatim in the object store; this module decodes them far enough to
//! enumerate root outputs, resources, and cross-workspace dependencies
//! declared through the Runway workspace-outputs data source.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rw_core::{gid, CoreError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// The only state schema version the core understands.
pub const STATE_SCHEMA_VERSION: u64 = 4;

/// Provider config literal the Terraform provider records on the
/// workspace-outputs data source.
pub const WORKSPACE_OUTPUTS_PROVIDER_CONFIG: &str =
    r#"provider["registry.terraform.io/runway-io/runway"]"#;

/// Resource type of the workspace-outputs data source.
pub const WORKSPACE_OUTPUTS_DATA_SOURCE: &str = "runway_workspace_outputs";

/// A parsed schema-v4 state payload.
#[derive(Debug, Clone, Deserialize)]
pub struct StateFile {
    pub version: u64,
    #[serde(default)]
    pub terraform_version: String,
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub lineage: String,
    #[serde(default)]
    pub outputs: BTreeMap<String, StateOutput>,
    #[serde(default)]
    pub resources: Vec<StateResource>,
}

/// A root output as recorded in state.
#[derive(Debug, Clone, Deserialize)]
pub struct StateOutput {
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub output_type: serde_json::Value,
    #[serde(default)]
    pub sensitive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateResource {
    #[serde(default)]
    pub module: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub instances: Vec<ResourceInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceInstance {
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// Flattened resource listing surfaced to adjacent services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateResourceSummary {
    pub module: String,
    pub mode: String,
    pub resource_type: String,
    pub name: String,
    pub provider: String,
}

/// A cross-workspace dependency declared via the workspace-outputs data
/// source, with global IDs translated back to raw IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDependency {
    pub full_path: String,
    pub workspace_id: String,
    pub state_version_id: String,
}

#[derive(Deserialize)]
struct DependencyAttributes {
    full_path: String,
    state_version_id: String,
    workspace_id: String,
}

/// Decode a base64 state payload as handed in by a worker.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(input.trim())
        .map_err(|e| CoreError::invalid(format!("state payload is not valid base64: {}", e)))
}

/// Parse a decoded state payload, enforcing schema version 4.
pub fn parse(data: &[u8]) -> Result<StateFile> {
    let state: StateFile = serde_json::from_slice(data)
        .map_err(|e| CoreError::internal(format!("malformed state payload: {}", e)))?;
    if state.version != STATE_SCHEMA_VERSION {
        return Err(CoreError::internal(format!(
            "unsupported state schema version {} (want {})",
            state.version, STATE_SCHEMA_VERSION
        )));
    }
    Ok(state)
}

impl StateFile {
    /// Every resource in the state, with the module defaulted to
    /// `root` and the provider name sliced out of the provider config.
    pub fn resource_summaries(&self) -> Vec<StateResourceSummary> {
        self.resources
            .iter()
            .map(|r| StateResourceSummary {
                module: if r.module.is_empty() { "root".to_string() } else { r.module.clone() },
                mode: r.mode.clone(),
                resource_type: r.resource_type.clone(),
                name: r.name.clone(),
                provider: provider_name(&r.provider),
            })
            .collect()
    }

    /// Cross-workspace dependencies: workspace-outputs data sources,
    /// with attributes decoded from each resource's first instance.
    pub fn workspace_dependencies(&self) -> Result<Vec<WorkspaceDependency>> {
        let mut dependencies = Vec::new();
        for resource in &self.resources {
            if resource.provider != WORKSPACE_OUTPUTS_PROVIDER_CONFIG
                || resource.resource_type != WORKSPACE_OUTPUTS_DATA_SOURCE
            {
                continue;
            }
            let Some(instance) = resource.instances.first() else {
                continue;
            };
            let attrs: DependencyAttributes = serde_json::from_value(instance.attributes.clone())
                .map_err(|e| {
                CoreError::internal(format!(
                    "malformed workspace-outputs attributes on {}: {}",
                    resource.name, e
                ))
            })?;
            dependencies.push(WorkspaceDependency {
                full_path: attrs.full_path,
                workspace_id: gid::to_raw(&attrs.workspace_id)?.to_string(),
                state_version_id: gid::to_raw(&attrs.state_version_id)?.to_string(),
            });
        }
        Ok(dependencies)
    }
}

/// Slice the provider name out of a provider config expression, e.g.
/// `provider["registry.terraform.io/hashicorp/aws"]` →
/// `registry.terraform.io/hashicorp/aws`. Unparseable configs pass
/// through unchanged.
fn provider_name(config: &str) -> String {
    match (config.find("[\""), config.rfind("\"]")) {
        (Some(start), Some(end)) if start + 2 <= end => config[start + 2..end].to_string(),
        _ => config.to_string(),
    }
}

#[cfg(test)]
#[path = "state_file_tests.rs"]
mod tests;
