// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace lock acquisition/release and dirty-state tracking.

use crate::manager::RunStateManager;
use crate::registry::{Change, ChangeHandler};
use async_trait::async_trait;
use rw_core::{ApplyStatus, CoreError, Job, JobStatus, Result, Run};
use rw_store::Transaction;
use tokio_util::sync::CancellationToken;

/// Enforces the persistent workspace lock.
///
/// A job entering `pending` acquires the lock atomically with the
/// claim: if the workspace is already locked the whole claiming update
/// fails with a conflict and nothing changes. A finishing job releases
/// the lock only when it is still the workspace's current job.
pub struct WorkspaceLockOnJob;

#[async_trait]
impl ChangeHandler<Job> for WorkspaceLockOnJob {
    fn name(&self) -> &'static str {
        "workspace-lock-on-job"
    }

    async fn handle(
        &self,
        _mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        _cancel: &CancellationToken,
        change: &Change<Job>,
    ) -> Result<()> {
        let became_pending =
            change.new.status == JobStatus::Pending && change.old.status != JobStatus::Pending;
        let finished =
            change.new.status == JobStatus::Finished && change.old.status != JobStatus::Finished;

        if became_pending {
            let mut workspace = tx.get_workspace(change.new.workspace_id.as_str())?;
            if workspace.locked {
                let holder = workspace
                    .current_job_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(CoreError::conflict(format!(
                    "workspace {} is locked by job {}",
                    workspace.id, holder
                )));
            }
            workspace.locked = true;
            workspace.current_job_id = Some(change.new.id);
            tx.update_workspace(workspace)?;
            tracing::debug!(
                workspace = %change.new.workspace_id,
                job = %change.new.id,
                "workspace lock acquired"
            );
        } else if finished {
            let mut workspace = tx.get_workspace(change.new.workspace_id.as_str())?;
            if workspace.current_job_id.as_ref() == Some(&change.new.id) {
                workspace.locked = false;
                workspace.current_job_id = None;
                tx.update_workspace(workspace)?;
                tracing::debug!(
                    workspace = %change.new.workspace_id,
                    job = %change.new.id,
                    "workspace lock released"
                );
            }
        }
        Ok(())
    }
}

/// Flags a workspace dirty when a force cancel killed an apply that may
/// have partially mutated real infrastructure.
pub struct WorkspaceDirtyOnRun;

#[async_trait]
impl ChangeHandler<Run> for WorkspaceDirtyOnRun {
    fn name(&self) -> &'static str {
        "workspace-dirty-on-run"
    }

    async fn handle(
        &self,
        _mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        _cancel: &CancellationToken,
        change: &Change<Run>,
    ) -> Result<()> {
        if change.old.force_canceled || !change.new.force_canceled {
            return Ok(());
        }
        let Some(apply_id) = &change.new.apply_id else {
            return Ok(());
        };
        let apply = tx.get_apply(apply_id.as_str())?;
        if apply.status != ApplyStatus::Canceled {
            return Ok(());
        }

        let mut workspace = tx.get_workspace(change.new.workspace_id.as_str())?;
        if !workspace.dirty_state {
            workspace.dirty_state = true;
            tx.update_workspace(workspace)?;
            tracing::warn!(
                workspace = %change.new.workspace_id,
                run = %change.new.id,
                "workspace state marked dirty after force-canceled apply"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
