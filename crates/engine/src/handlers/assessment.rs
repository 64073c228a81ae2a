// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run → workspace assessment glue for drift detection.

use crate::manager::RunStateManager;
use crate::registry::{Change, ChangeHandler};
use async_trait::async_trait;
use rw_core::{metrics, CoreError, Result, Run, RunStatus};
use rw_store::Transaction;
use tokio_util::sync::CancellationToken;

/// Reacts to runs reaching a terminal state.
///
/// An ordinary run that replaced the workspace's current state version
/// invalidates the prior drift measurement, so the assessment row is
/// cleared. An assessment run records its outcome on the existing row;
/// drift fields are only touched when the run finished with a plan
/// (other terminal states stamp completion without a drift verdict).
pub struct AssessmentOnRun;

#[async_trait]
impl ChangeHandler<Run> for AssessmentOnRun {
    fn name(&self) -> &'static str {
        "assessment-on-run"
    }

    async fn handle(
        &self,
        _mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        _cancel: &CancellationToken,
        change: &Change<Run>,
    ) -> Result<()> {
        if !change.new.status.is_terminal() || change.old.status == change.new.status {
            return Ok(());
        }
        let run = &change.new;

        if !run.is_assessment_run {
            if run.speculative() {
                return Ok(());
            }
            self.clear_if_state_replaced(tx, run)
        } else {
            self.record_outcome(tx, run)
        }
    }
}

impl AssessmentOnRun {
    /// Clear the workspace's assessment iff this run produced the
    /// workspace's current state version.
    fn clear_if_state_replaced(&self, tx: &mut Transaction<'_>, run: &Run) -> Result<()> {
        let workspace = tx.get_workspace(run.workspace_id.as_str())?;
        let Some(sv_id) = &workspace.current_state_version_id else {
            return Ok(());
        };
        let state_version = tx.get_state_version(sv_id.as_str())?;
        if state_version.run_id.as_ref() != Some(&run.id) {
            return Ok(());
        }
        if let Some(assessment) = tx.assessment_for_workspace(&run.workspace_id) {
            tx.delete_assessment(assessment.id.as_str())?;
            tracing::debug!(
                workspace = %run.workspace_id,
                run = %run.id,
                "assessment cleared; state version replaced"
            );
        }
        Ok(())
    }

    fn record_outcome(&self, tx: &mut Transaction<'_>, run: &Run) -> Result<()> {
        let mut assessment = tx.assessment_for_workspace(&run.workspace_id).ok_or_else(|| {
            CoreError::internal(format!(
                "assessment run {} finished but workspace {} has no assessment",
                run.id, run.workspace_id
            ))
        })?;

        if run.status == RunStatus::PlannedAndFinished {
            let plan = tx.get_plan(run.plan_id.as_str())?;
            let has_drift = plan.summary.resource_drift > 0;
            let newly_drifted = has_drift && !assessment.has_drift;
            assessment.requires_notification = newly_drifted;
            assessment.has_drift = has_drift;
            if newly_drifted {
                metrics::WORKSPACE_DRIFT_COUNT.increment();
            }
        }
        assessment.run_id = Some(run.id);
        assessment.completed_at = Some(tx.now());
        tx.update_assessment(assessment)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "assessment_tests.rs"]
mod tests;
