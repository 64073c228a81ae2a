// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State version and state version output entities.
//!
//! A state version is an immutable snapshot of Terraform state for a
//! workspace: a database row plus an opaque blob in the object store.
//! Outputs are enumerated into child rows at creation time so adjacent
//! services can query them without fetching the blob.

use crate::metadata::RowMetadata;
use crate::run::RunId;
use crate::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a state version.
    pub struct StateVersionId("sv-");
}

crate::define_id! {
    /// Unique identifier for a state version output row.
    pub struct StateVersionOutputId("svo-");
}

/// An immutable state snapshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVersion {
    pub id: StateVersionId,
    pub metadata: RowMetadata,
    pub workspace_id: WorkspaceId,
    /// The run that produced this snapshot, when it came from an apply
    /// rather than an out-of-band upload.
    pub run_id: Option<RunId>,
    pub created_by: String,
}

/// A single root output enumerated from a state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVersionOutput {
    pub id: StateVersionOutputId,
    pub metadata: RowMetadata,
    pub state_version_id: StateVersionId,
    pub name: String,
    pub value: serde_json::Value,
    /// Terraform type expression for the value, as recorded in state.
    pub output_type: serde_json::Value,
    pub sensitive: bool,
}

crate::builder! {
    pub struct StateVersionBuilder => StateVersion {
        into {
            id: StateVersionId = StateVersionId::new(),
            workspace_id: WorkspaceId = WorkspaceId::new(),
            created_by: String = "test-user",
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
        }
        option {
            run_id: RunId = None,
        }
    }
}

#[cfg(test)]
#[path = "state_version_tests.rs"]
mod tests;
