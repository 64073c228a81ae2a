// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Committed table state.

use crate::activity::ActivityEvent;
use rw_core::{
    Apply, ConfigurationVersion, EntityTable, Job, Plan, Run, StateVersion, StateVersionOutput,
    Workspace, WorkspaceAssessment,
};
use std::collections::HashMap;

/// All committed rows, keyed by entity ID.
#[derive(Default)]
pub(crate) struct Tables {
    pub runs: HashMap<String, Run>,
    pub plans: HashMap<String, Plan>,
    pub applies: HashMap<String, Apply>,
    pub jobs: HashMap<String, Job>,
    pub workspaces: HashMap<String, Workspace>,
    pub state_versions: HashMap<String, StateVersion>,
    pub state_version_outputs: HashMap<String, StateVersionOutput>,
    pub configuration_versions: HashMap<String, ConfigurationVersion>,
    pub assessments: HashMap<String, WorkspaceAssessment>,
    pub activity: Vec<ActivityEvent>,
}

impl Tables {
    /// Committed row version, or None when the row does not exist.
    pub fn version_of(&self, table: EntityTable, id: &str) -> Option<u64> {
        match table {
            EntityTable::Runs => self.runs.get(id).map(|e| e.metadata.version),
            EntityTable::Plans => self.plans.get(id).map(|e| e.metadata.version),
            EntityTable::Applies => self.applies.get(id).map(|e| e.metadata.version),
            EntityTable::Jobs => self.jobs.get(id).map(|e| e.metadata.version),
            EntityTable::Workspaces => self.workspaces.get(id).map(|e| e.metadata.version),
            EntityTable::StateVersions => {
                self.state_versions.get(id).map(|e| e.metadata.version)
            }
            EntityTable::StateVersionOutputs => {
                self.state_version_outputs.get(id).map(|e| e.metadata.version)
            }
            EntityTable::ConfigurationVersions => {
                self.configuration_versions.get(id).map(|e| e.metadata.version)
            }
            EntityTable::WorkspaceAssessments => {
                self.assessments.get(id).map(|e| e.metadata.version)
            }
        }
    }

    /// Remove a row by table and ID.
    pub fn remove(&mut self, table: EntityTable, id: &str) {
        match table {
            EntityTable::Runs => {
                self.runs.remove(id);
            }
            EntityTable::Plans => {
                self.plans.remove(id);
            }
            EntityTable::Applies => {
                self.applies.remove(id);
            }
            EntityTable::Jobs => {
                self.jobs.remove(id);
            }
            EntityTable::Workspaces => {
                self.workspaces.remove(id);
            }
            EntityTable::StateVersions => {
                self.state_versions.remove(id);
            }
            EntityTable::StateVersionOutputs => {
                self.state_version_outputs.remove(id);
            }
            EntityTable::ConfigurationVersions => {
                self.configuration_versions.remove(id);
            }
            EntityTable::WorkspaceAssessments => {
                self.assessments.remove(id);
            }
        }
    }
}
