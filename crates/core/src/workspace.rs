// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identifier and entity.
//!
//! The pair `locked` + `current_job_id` is a persistent mutual-exclusion
//! claim over the workspace: exactly one job may hold it, and a worker
//! obtains it by transitioning its job to `pending`. There is no
//! in-memory workspace lock.

use crate::job::JobId;
use crate::metadata::RowMetadata;
use crate::state_version::StateVersionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a workspace.
    pub struct WorkspaceId("wks-");
}

/// A workspace instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub metadata: RowMetadata,
    /// Hierarchical namespace path, e.g. `team/project/production`.
    pub full_path: String,
    /// Owning group reference (group management is an adjacent service).
    pub group_id: String,
    pub current_state_version_id: Option<StateVersionId>,
    pub current_job_id: Option<JobId>,
    /// Set when an apply may have mutated real infrastructure without a
    /// recorded state version (e.g. a force-canceled apply).
    pub dirty_state: bool,
    pub locked: bool,
    /// Maximum wall-clock minutes a job against this workspace may run.
    pub max_job_duration: i32,
    pub terraform_version: String,
}

impl Workspace {
    /// Invariant: `locked` iff a current job is recorded.
    pub fn lock_is_consistent(&self) -> bool {
        self.locked == self.current_job_id.is_some()
    }
}

crate::builder! {
    pub struct WorkspaceBuilder => Workspace {
        into {
            id: WorkspaceId = WorkspaceId::new(),
            full_path: String = "test-group/test-workspace",
            group_id: String = "grp-1",
            terraform_version: String = "1.9.0",
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
            dirty_state: bool = false,
            locked: bool = false,
            max_job_duration: i32 = 60,
        }
        option {
            current_state_version_id: StateVersionId = None,
            current_job_id: JobId = None,
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
