// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-store key scheme.
//!
//! Keys are deterministic; concurrent writes to one key are excluded by
//! the workspace lock on the owning run. The scheme is stable; stored
//! objects outlive releases.

use rw_core::{ConfigurationVersionId, PlanId, RunId, StateVersionId, WorkspaceId};

pub fn configuration_version(workspace_id: &WorkspaceId, id: &ConfigurationVersionId) -> String {
    format!("workspaces/{}/configuration_versions/{}.tar.gz", workspace_id, id)
}

pub fn state_version(workspace_id: &WorkspaceId, id: &StateVersionId) -> String {
    format!("workspaces/{}/state_versions/{}.json", workspace_id, id)
}

pub fn plan_cache(workspace_id: &WorkspaceId, run_id: &RunId, plan_id: &PlanId) -> String {
    format!("workspaces/{}/runs/{}/plan/{}", workspace_id, run_id, plan_id)
}

pub fn plan_json(workspace_id: &WorkspaceId, run_id: &RunId, plan_id: &PlanId) -> String {
    format!("workspaces/{}/runs/{}/plan/{}.json", workspace_id, run_id, plan_id)
}

pub fn plan_diff(workspace_id: &WorkspaceId, run_id: &RunId, plan_id: &PlanId) -> String {
    format!("workspaces/{}/runs/{}/plan/diff_{}.json", workspace_id, run_id, plan_id)
}

pub fn run_variables(workspace_id: &WorkspaceId, run_id: &RunId) -> String {
    format!("workspaces/{}/runs/{}/variables.json", workspace_id, run_id)
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
