// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan identifier, state machine, and entity.

use crate::error::{CoreError, Result};
use crate::metadata::RowMetadata;
use crate::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a plan.
    pub struct PlanId("plan-");
}

/// Lifecycle status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanStatus {
    Queued,
    Pending,
    Running,
    Canceled,
    Errored,
    Finished,
}

crate::simple_display! {
    PlanStatus {
        Queued => "queued",
        Pending => "pending",
        Running => "running",
        Canceled => "canceled",
        Errored => "errored",
        Finished => "finished",
    }
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanStatus::Canceled | PlanStatus::Errored | PlanStatus::Finished)
    }

    /// Validate a status change against the plan state machine.
    ///
    /// Equality is always valid (no-op update of other fields).
    pub fn validate_transition(self, new: PlanStatus) -> Result<()> {
        if self == new {
            return Ok(());
        }
        let allowed = match self {
            PlanStatus::Queued => matches!(new, PlanStatus::Pending | PlanStatus::Canceled),
            PlanStatus::Pending => matches!(new, PlanStatus::Running | PlanStatus::Canceled),
            PlanStatus::Running => {
                matches!(new, PlanStatus::Canceled | PlanStatus::Errored | PlanStatus::Finished)
            }
            PlanStatus::Canceled | PlanStatus::Errored | PlanStatus::Finished => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(CoreError::invalid(format!(
                "plan status cannot transition from {} to {}",
                self, new
            )))
        }
    }
}

/// Resource and drift counts reported by the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub resource_additions: i32,
    pub resource_changes: i32,
    pub resource_destructions: i32,
    /// Resources whose live state diverged from the recorded state.
    /// Drives the workspace drift assessment.
    pub resource_drift: i32,
}

/// A plan instance, owned 1:1 by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub metadata: RowMetadata,
    pub workspace_id: WorkspaceId,
    pub status: PlanStatus,
    pub has_changes: bool,
    pub summary: PlanSummary,
    pub error_message: Option<String>,
}

crate::builder! {
    pub struct PlanBuilder => Plan {
        into {
            id: PlanId = PlanId::new(),
            workspace_id: WorkspaceId = WorkspaceId::new(),
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
            status: PlanStatus = PlanStatus::Queued,
            has_changes: bool = false,
            summary: PlanSummary = PlanSummary::default(),
        }
        option {
            error_message: String = None,
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
