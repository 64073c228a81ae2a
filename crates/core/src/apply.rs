// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Apply identifier, state machine, and entity.

use crate::error::{CoreError, Result};
use crate::metadata::RowMetadata;
use crate::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an apply.
    pub struct ApplyId("appl-");
}

/// Lifecycle status of an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyStatus {
    Created,
    Queued,
    Pending,
    Running,
    Canceled,
    Errored,
    Finished,
}

crate::simple_display! {
    ApplyStatus {
        Created => "created",
        Queued => "queued",
        Pending => "pending",
        Running => "running",
        Canceled => "canceled",
        Errored => "errored",
        Finished => "finished",
    }
}

impl ApplyStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ApplyStatus::Canceled | ApplyStatus::Errored | ApplyStatus::Finished)
    }

    /// Validate a status change against the apply state machine.
    ///
    /// Equality is always valid (no-op update of other fields).
    pub fn validate_transition(self, new: ApplyStatus) -> Result<()> {
        if self == new {
            return Ok(());
        }
        let allowed = match self {
            ApplyStatus::Created => matches!(new, ApplyStatus::Queued | ApplyStatus::Canceled),
            ApplyStatus::Queued => matches!(new, ApplyStatus::Pending | ApplyStatus::Canceled),
            ApplyStatus::Pending => matches!(new, ApplyStatus::Running | ApplyStatus::Canceled),
            ApplyStatus::Running => {
                matches!(new, ApplyStatus::Canceled | ApplyStatus::Errored | ApplyStatus::Finished)
            }
            ApplyStatus::Canceled | ApplyStatus::Errored | ApplyStatus::Finished => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(CoreError::invalid(format!(
                "apply status cannot transition from {} to {}",
                self, new
            )))
        }
    }
}

/// An apply instance, owned 1:1 by a non-speculative run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apply {
    pub id: ApplyId,
    pub metadata: RowMetadata,
    pub workspace_id: WorkspaceId,
    pub status: ApplyStatus,
    /// Subject that queued the apply, when it has been queued.
    pub triggered_by: Option<String>,
    pub error_message: Option<String>,
}

crate::builder! {
    pub struct ApplyBuilder => Apply {
        into {
            id: ApplyId = ApplyId::new(),
            workspace_id: WorkspaceId = WorkspaceId::new(),
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
            status: ApplyStatus = ApplyStatus::Created,
        }
        option {
            triggered_by: String = None,
            error_message: String = None,
        }
    }
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
