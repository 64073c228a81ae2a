// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace assessment entity for scheduled drift detection.

use crate::metadata::RowMetadata;
use crate::run::RunId;
use crate::workspace::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a workspace assessment.
    pub struct WorkspaceAssessmentId("asmt-");
}

/// Per-workspace drift-detection record.
///
/// One row per workspace at most. Upserted when an assessment run is
/// scheduled, updated when it completes, and cleared when an ordinary
/// run replaces the workspace's current state version (the prior drift
/// measurement is no longer meaningful).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceAssessment {
    pub id: WorkspaceAssessmentId,
    pub metadata: RowMetadata,
    pub workspace_id: WorkspaceId,
    pub has_drift: bool,
    /// Drift newly appeared on the latest assessment; consumers reset it
    /// after notifying.
    pub requires_notification: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// The most recent assessment run for this workspace.
    pub run_id: Option<RunId>,
}

crate::builder! {
    pub struct WorkspaceAssessmentBuilder => WorkspaceAssessment {
        into {
            id: WorkspaceAssessmentId = WorkspaceAssessmentId::new(),
            workspace_id: WorkspaceId = WorkspaceId::new(),
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
            has_drift: bool = false,
            requires_notification: bool = false,
            started_at: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH,
        }
        option {
            completed_at: DateTime<Utc> = None,
            run_id: RunId = None,
        }
    }
}

#[cfg(test)]
#[path = "assessment_tests.rs"]
mod tests;
