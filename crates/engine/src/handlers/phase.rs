// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job → plan/apply pending propagation.
//!
//! A worker claims a queued job by transitioning it to `pending`; the
//! corresponding phase follows so the planner/applier observes a
//! claimed phase the moment the claim commits.

use crate::manager::RunStateManager;
use crate::registry::{Change, ChangeHandler};
use async_trait::async_trait;
use rw_core::{ApplyStatus, CoreError, Job, JobStatus, JobType, PlanStatus, Result};
use rw_store::Transaction;
use tokio_util::sync::CancellationToken;

pub struct PhasePendingOnJob;

#[async_trait]
impl ChangeHandler<Job> for PhasePendingOnJob {
    fn name(&self) -> &'static str {
        "phase-pending-on-job"
    }

    async fn handle(
        &self,
        mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        change: &Change<Job>,
    ) -> Result<()> {
        if change.new.status != JobStatus::Pending || change.old.status == JobStatus::Pending {
            return Ok(());
        }

        let run = tx.get_run(change.new.run_id.as_str())?;
        match change.new.kind {
            JobType::Plan => {
                let mut plan = tx.get_plan(run.plan_id.as_str())?;
                if plan.status != PlanStatus::Pending {
                    plan.status = PlanStatus::Pending;
                    mgr.update_plan_in(tx, cancel, plan).await?;
                }
            }
            JobType::Apply => {
                let apply_id = run.apply_id.ok_or_else(|| {
                    CoreError::internal(format!(
                        "apply job {} for run {} without an apply",
                        change.new.id, run.id
                    ))
                })?;
                let mut apply = tx.get_apply(apply_id.as_str())?;
                if apply.status != ApplyStatus::Pending {
                    apply.status = ApplyStatus::Pending;
                    mgr.update_apply_in(tx, cancel, apply).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
