// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan → run and apply → run cascades.

use crate::manager::RunStateManager;
use crate::registry::{Change, ChangeHandler};
use async_trait::async_trait;
use rw_core::{metrics, Apply, ApplyStatus, Plan, PlanStatus, Result, Run, RunStatus};
use rw_store::Transaction;
use tokio_util::sync::CancellationToken;

/// Keeps the owning run in lockstep with its plan.
pub struct PlanRunCascade;

#[async_trait]
impl ChangeHandler<Plan> for PlanRunCascade {
    fn name(&self) -> &'static str {
        "plan-run-cascade"
    }

    async fn handle(
        &self,
        mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        change: &Change<Plan>,
    ) -> Result<()> {
        if change.old.status == change.new.status {
            return Ok(());
        }
        if change.new.status.is_terminal() {
            metrics::PLAN_COMPLETED.increment();
        }

        let mut run = tx.run_for_plan(&change.new.id)?;
        let next = match change.new.status {
            PlanStatus::Running => Some(RunStatus::Planning),
            PlanStatus::Canceled => Some(RunStatus::Canceled),
            PlanStatus::Errored => Some(RunStatus::Errored),
            PlanStatus::Finished => {
                run.has_changes = change.new.has_changes;
                // A finished plan with changes and an apply phase waits
                // for confirmation; anything else is done.
                Some(if run.apply_id.is_some() && change.new.has_changes {
                    RunStatus::Planned
                } else {
                    RunStatus::PlannedAndFinished
                })
            }
            PlanStatus::Queued | PlanStatus::Pending => None,
        };

        if let Some(next) = next {
            if run.status != next && !run.status.is_terminal() {
                run.status = next;
                mgr.update_run_in(tx, cancel, run).await?;
            }
        }
        Ok(())
    }
}

/// Keeps the owning run in lockstep with its apply.
pub struct ApplyRunCascade;

#[async_trait]
impl ChangeHandler<Apply> for ApplyRunCascade {
    fn name(&self) -> &'static str {
        "apply-run-cascade"
    }

    async fn handle(
        &self,
        mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        change: &Change<Apply>,
    ) -> Result<()> {
        if change.old.status == change.new.status {
            return Ok(());
        }
        if change.new.status.is_terminal() {
            metrics::APPLY_COMPLETED.increment();
        }

        let mut run = tx.run_for_apply(&change.new.id)?;
        let next = match change.new.status {
            ApplyStatus::Queued => Some(RunStatus::ApplyQueued),
            ApplyStatus::Running => Some(RunStatus::Applying),
            ApplyStatus::Canceled => Some(RunStatus::Canceled),
            ApplyStatus::Errored => Some(RunStatus::Errored),
            ApplyStatus::Finished => Some(RunStatus::Applied),
            ApplyStatus::Created | ApplyStatus::Pending => None,
        };

        if let Some(next) = next {
            if run.status != next && !run.status.is_terminal() {
                run.status = next;
                mgr.update_run_in(tx, cancel, run).await?;
            }
        }
        Ok(())
    }
}

/// Settles an apply that never ran when its run terminates.
///
/// A run can reach a terminal state before its apply phase starts: a
/// canceled plan, a finished plan with no changes, a canceled planned
/// run. The orphaned apply is transitioned to `canceled` so a terminal
/// run never leaves an in-flight apply behind.
pub struct ApplySettleOnRun;

#[async_trait]
impl ChangeHandler<Run> for ApplySettleOnRun {
    fn name(&self) -> &'static str {
        "apply-settle-on-run"
    }

    async fn handle(
        &self,
        mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        change: &Change<Run>,
    ) -> Result<()> {
        if !change.new.status.is_terminal() || change.old.status == change.new.status {
            return Ok(());
        }
        let Some(apply_id) = &change.new.apply_id else {
            return Ok(());
        };
        let apply = tx.get_apply(apply_id.as_str())?;
        if apply.status.is_terminal() {
            return Ok(());
        }
        let mut apply = apply;
        apply.status = ApplyStatus::Canceled;
        mgr.update_apply_in(tx, cancel, apply).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
