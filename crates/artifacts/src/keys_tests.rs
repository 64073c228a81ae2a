// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn ids() -> (WorkspaceId, RunId, PlanId) {
    (
        WorkspaceId::from_string("wks-1"),
        RunId::from_string("run-2"),
        PlanId::from_string("plan-3"),
    )
}

#[test]
fn configuration_version_key() {
    let ws = WorkspaceId::from_string("wks-1");
    let cv = ConfigurationVersionId::from_string("cv-9");
    assert_eq!(
        configuration_version(&ws, &cv),
        "workspaces/wks-1/configuration_versions/cv-9.tar.gz"
    );
}

#[test]
fn state_version_key() {
    let ws = WorkspaceId::from_string("wks-1");
    let sv = StateVersionId::from_string("sv-7");
    assert_eq!(state_version(&ws, &sv), "workspaces/wks-1/state_versions/sv-7.json");
}

#[test]
fn plan_artifact_keys() {
    let (ws, run, plan) = ids();
    assert_eq!(plan_cache(&ws, &run, &plan), "workspaces/wks-1/runs/run-2/plan/plan-3");
    assert_eq!(plan_json(&ws, &run, &plan), "workspaces/wks-1/runs/run-2/plan/plan-3.json");
    assert_eq!(
        plan_diff(&ws, &run, &plan),
        "workspaces/wks-1/runs/run-2/plan/diff_plan-3.json"
    );
}

#[test]
fn run_variables_key() {
    let (ws, run, _) = ids();
    assert_eq!(run_variables(&ws, &run), "workspaces/wks-1/runs/run-2/variables.json");
}
