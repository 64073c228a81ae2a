// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row-level change records emitted by the backing store on commit.

use serde::{Deserialize, Serialize};

/// The entity family a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Runs,
    Plans,
    Applies,
    Jobs,
    Workspaces,
    StateVersions,
    StateVersionOutputs,
    ConfigurationVersions,
    WorkspaceAssessments,
}

crate::simple_display! {
    EntityTable {
        Runs => "runs",
        Plans => "plans",
        Applies => "applies",
        Jobs => "jobs",
        Workspaces => "workspaces",
        StateVersions => "state_versions",
        StateVersionOutputs => "state_version_outputs",
        ConfigurationVersions => "configuration_versions",
        WorkspaceAssessments => "workspace_assessments",
    }
}

/// Row-level mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

crate::simple_display! {
    ChangeAction {
        Insert => "INSERT",
        Update => "UPDATE",
        Delete => "DELETE",
    }
}

/// A single row-level change as surfaced on the store's listen stream.
///
/// `data` is the opaque row payload at the time of the change. Consumers
/// re-read the entity after each delivered event rather than trusting it;
/// delivery is at-most-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: EntityTable,
    pub action: ChangeAction,
    pub id: String,
    pub data: serde_json::Value,
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
