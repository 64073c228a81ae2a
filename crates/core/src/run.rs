// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifier, state machine, and entity.
//!
//! A run is the top-level unit of work: one invocation of plan and,
//! unless speculative, apply against a workspace.

use crate::apply::ApplyId;
use crate::configuration_version::ConfigurationVersionId;
use crate::error::{CoreError, Result};
use crate::metadata::RowMetadata;
use crate::plan::PlanId;
use crate::workspace::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a run.
    pub struct RunId("run-");
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    PlanQueued,
    ApplyQueued,
    Planning,
    Applying,
    Planned,
    PlannedAndFinished,
    Applied,
    Canceled,
    Errored,
}

crate::simple_display! {
    RunStatus {
        PlanQueued => "planQueued",
        ApplyQueued => "applyQueued",
        Planning => "planning",
        Applying => "applying",
        Planned => "planned",
        PlannedAndFinished => "plannedAndFinished",
        Applied => "applied",
        Canceled => "canceled",
        Errored => "errored",
    }
}

impl RunStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::PlannedAndFinished
                | RunStatus::Applied
                | RunStatus::Canceled
                | RunStatus::Errored
        )
    }

    /// Validate a status change against the run state machine.
    ///
    /// Equality is always valid (no-op update of other fields).
    pub fn validate_transition(self, new: RunStatus) -> Result<()> {
        if self == new {
            return Ok(());
        }
        let allowed = match self {
            RunStatus::PlanQueued => {
                matches!(new, RunStatus::Canceled | RunStatus::Errored | RunStatus::Planning)
            }
            RunStatus::ApplyQueued => {
                matches!(new, RunStatus::Canceled | RunStatus::Errored | RunStatus::Applying)
            }
            RunStatus::Planning => matches!(
                new,
                RunStatus::Canceled
                    | RunStatus::Errored
                    | RunStatus::Planned
                    | RunStatus::PlannedAndFinished
            ),
            RunStatus::Applying => {
                matches!(new, RunStatus::Canceled | RunStatus::Errored | RunStatus::Applied)
            }
            RunStatus::Planned => matches!(new, RunStatus::Canceled | RunStatus::ApplyQueued),
            RunStatus::PlannedAndFinished
            | RunStatus::Applied
            | RunStatus::Canceled
            | RunStatus::Errored => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(CoreError::invalid(format!(
                "run status cannot transition from {} to {}",
                self, new
            )))
        }
    }
}

/// A run instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub metadata: RowMetadata,
    pub workspace_id: WorkspaceId,
    pub plan_id: PlanId,
    /// Absent for speculative runs, which never produce an apply phase.
    pub apply_id: Option<ApplyId>,
    pub configuration_version_id: Option<ConfigurationVersionId>,
    pub status: RunStatus,
    pub has_changes: bool,
    pub force_canceled: bool,
    /// Stamped when a graceful cancel was requested; a force cancel is
    /// only accepted after this is set.
    pub cancel_requested_at: Option<DateTime<Utc>>,
    pub is_destroy: bool,
    pub is_assessment_run: bool,
    pub terraform_version: String,
    pub created_by: String,
}

impl Run {
    /// A run is speculative when it has no apply phase.
    pub fn speculative(&self) -> bool {
        self.apply_id.is_none()
    }
}

crate::builder! {
    pub struct RunBuilder => Run {
        into {
            id: RunId = RunId::new(),
            workspace_id: WorkspaceId = WorkspaceId::new(),
            plan_id: PlanId = PlanId::new(),
            terraform_version: String = "1.9.0",
            created_by: String = "test-user",
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
            status: RunStatus = RunStatus::PlanQueued,
            has_changes: bool = false,
            force_canceled: bool = false,
            is_destroy: bool = false,
            is_assessment_run: bool = false,
        }
        option {
            apply_id: ApplyId = None,
            configuration_version_id: ConfigurationVersionId = None,
            cancel_requested_at: DateTime<Utc> = None,
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
