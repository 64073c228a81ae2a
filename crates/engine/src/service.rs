// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle operations exposed to adjacent services.
//!
//! These compose the transactional update primitives in
//! [`crate::manager`] into the operations callers actually invoke:
//! creating runs, confirming applies, canceling, claiming jobs, and
//! scheduling assessments. Authorization is checked here, at the API
//! boundary; handlers below this layer assume an authorized caller.

use crate::manager::RunStateManager;
use rw_core::{
    Apply, ApplyId, ApplyStatus, Caller, ConfigurationVersionId, ConfigurationVersionStatus,
    CoreError, EntityTable, Job, JobId, JobStatus, JobTimestamps, JobType, Plan, PlanId,
    PlanStatus, PlanSummary, Result, RowMetadata, Run, RunId, RunStatus, Workspace,
    WorkspaceAssessment, WorkspaceAssessmentId, WorkspaceId,
};
use rw_store::{ActivityEvent, Transaction};
use tokio_util::sync::CancellationToken;

/// Input for [`RunStateManager::create_run`].
#[derive(Debug, Clone)]
pub struct CreateRunInput {
    pub workspace_id: WorkspaceId,
    pub configuration_version_id: Option<ConfigurationVersionId>,
    /// Create a run with no apply phase: a projected plan only.
    pub speculative: bool,
    pub is_destroy: bool,
    pub is_assessment_run: bool,
    /// Defaults to the workspace's Terraform version.
    pub terraform_version: Option<String>,
}

impl CreateRunInput {
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            configuration_version_id: None,
            speculative: false,
            is_destroy: false,
            is_assessment_run: false,
            terraform_version: None,
        }
    }
}

impl RunStateManager {
    /// Create a run with its plan, its apply (unless speculative), and
    /// the queued plan job, atomically.
    pub async fn create_run(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        input: CreateRunInput,
    ) -> Result<Run> {
        let mut tx = self.database().begin(cancel)?;
        let workspace = tx.get_workspace(input.workspace_id.as_str())?;
        caller.require_permission("run:create", &workspace.full_path)?;

        if let Some(cv_id) = &input.configuration_version_id {
            let cv = tx.get_configuration_version(cv_id.as_str())?;
            if cv.status != ConfigurationVersionStatus::Uploaded {
                return Err(CoreError::invalid(format!(
                    "configuration version {} has not been uploaded",
                    cv.id
                )));
            }
            if cv.speculative && !input.speculative {
                return Err(CoreError::invalid(format!(
                    "configuration version {} is speculative; the run must be too",
                    cv.id
                )));
            }
        }
        if input.is_assessment_run && !input.speculative {
            return Err(CoreError::invalid("assessment runs must be speculative"));
        }

        let plan = tx.insert_plan(Plan {
            id: PlanId::new(),
            metadata: RowMetadata::default(),
            workspace_id: workspace.id,
            status: PlanStatus::Queued,
            has_changes: false,
            summary: PlanSummary::default(),
            error_message: None,
        })?;

        let apply_id = if input.speculative {
            None
        } else {
            let apply = tx.insert_apply(Apply {
                id: ApplyId::new(),
                metadata: RowMetadata::default(),
                workspace_id: workspace.id,
                status: ApplyStatus::Created,
                triggered_by: None,
                error_message: None,
            })?;
            Some(apply.id)
        };

        let run = tx.insert_run(Run {
            id: RunId::new(),
            metadata: RowMetadata::default(),
            workspace_id: workspace.id,
            plan_id: plan.id,
            apply_id,
            configuration_version_id: input.configuration_version_id,
            status: RunStatus::PlanQueued,
            has_changes: false,
            force_canceled: false,
            cancel_requested_at: None,
            is_destroy: input.is_destroy,
            is_assessment_run: input.is_assessment_run,
            terraform_version: input
                .terraform_version
                .unwrap_or_else(|| workspace.terraform_version.clone()),
            created_by: caller.subject().to_string(),
        })?;

        let job = self.queue_job(&mut tx, &run, &workspace, JobType::Plan)?;

        let now = tx.now();
        tx.record_activity(ActivityEvent {
            action: "run.create".to_string(),
            target_table: EntityTable::Runs,
            target_id: run.id.to_string(),
            subject: caller.subject().to_string(),
            occurred_at: now,
        });
        tx.commit(cancel)?;

        tracing::info!(
            run = %run.id,
            workspace = %workspace.id,
            job = %job.id,
            speculative = run.speculative(),
            assessment = run.is_assessment_run,
            "run created"
        );
        Ok(run)
    }

    /// Confirm a planned run: queue the apply job and transition the
    /// apply to `queued`, which cascades the run to `applyQueued`.
    pub async fn apply_run(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        run_id: &RunId,
    ) -> Result<Run> {
        let mut tx = self.database().begin(cancel)?;
        let run = tx.get_run(run_id.as_str())?;
        let workspace = tx.get_workspace(run.workspace_id.as_str())?;
        caller.require_permission("run:apply", &workspace.full_path)?;

        if run.status != RunStatus::Planned {
            return Err(CoreError::invalid(format!(
                "run {} cannot be applied in status {}",
                run.id, run.status
            )));
        }
        let apply_id = run.apply_id.ok_or_else(|| {
            CoreError::invalid(format!("speculative run {} cannot be applied", run.id))
        })?;

        self.queue_job(&mut tx, &run, &workspace, JobType::Apply)?;

        let mut apply = tx.get_apply(apply_id.as_str())?;
        apply.status = ApplyStatus::Queued;
        apply.triggered_by = Some(caller.subject().to_string());
        self.update_apply_in(&mut tx, cancel, apply).await?;

        let now = tx.now();
        tx.record_activity(ActivityEvent {
            action: "run.apply".to_string(),
            target_table: EntityTable::Runs,
            target_id: run.id.to_string(),
            subject: caller.subject().to_string(),
            occurred_at: now,
        });
        tx.commit(cancel)?;
        self.database().get_run(run_id.as_str())
    }

    /// Request cancellation of a run.
    ///
    /// Unclaimed phases are canceled outright; a claimed phase is wound
    /// down gracefully by flagging its job, and the phase reports the
    /// cancel itself when the worker exits.
    pub async fn cancel_run(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        run_id: &RunId,
    ) -> Result<Run> {
        let mut tx = self.database().begin(cancel)?;
        let run = tx.get_run(run_id.as_str())?;
        let workspace = tx.get_workspace(run.workspace_id.as_str())?;
        caller.require_permission("run:cancel", &workspace.full_path)?;

        if run.status.is_terminal() {
            return Err(CoreError::invalid(format!(
                "run {} is already {}",
                run.id, run.status
            )));
        }

        match run.status {
            RunStatus::PlanQueued | RunStatus::Planning => {
                let plan = tx.get_plan(run.plan_id.as_str())?;
                if plan.status == PlanStatus::Queued {
                    let mut plan = plan;
                    plan.status = PlanStatus::Canceled;
                    self.update_plan_in(&mut tx, cancel, plan).await?;
                } else {
                    self.request_graceful_cancel(&mut tx, cancel, run.clone(), JobType::Plan)
                        .await?;
                }
            }
            RunStatus::ApplyQueued | RunStatus::Applying => {
                let apply_id = run.apply_id.ok_or_else(|| {
                    CoreError::internal(format!("run {} in apply phase without an apply", run.id))
                })?;
                let apply = tx.get_apply(apply_id.as_str())?;
                if apply.status == ApplyStatus::Queued {
                    let mut apply = apply;
                    apply.status = ApplyStatus::Canceled;
                    self.update_apply_in(&mut tx, cancel, apply).await?;
                } else {
                    self.request_graceful_cancel(&mut tx, cancel, run.clone(), JobType::Apply)
                        .await?;
                }
            }
            RunStatus::Planned => {
                let mut run = run.clone();
                run.status = RunStatus::Canceled;
                self.update_run_in(&mut tx, cancel, run).await?;
            }
            _ => {}
        }

        let now = tx.now();
        tx.record_activity(ActivityEvent {
            action: "run.cancel".to_string(),
            target_table: EntityTable::Runs,
            target_id: run.id.to_string(),
            subject: caller.subject().to_string(),
            occurred_at: now,
        });
        tx.commit(cancel)?;
        self.database().get_run(run_id.as_str())
    }

    /// Force-cancel a run whose graceful cancel did not converge.
    ///
    /// Requires a prior graceful attempt. Kills the active phase
    /// outright and stamps `force_canceled`, which marks the workspace
    /// dirty when the apply may have touched real infrastructure.
    pub async fn force_cancel_run(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        run_id: &RunId,
    ) -> Result<Run> {
        let mut tx = self.database().begin(cancel)?;
        let run = tx.get_run(run_id.as_str())?;
        let workspace = tx.get_workspace(run.workspace_id.as_str())?;
        caller.require_permission("run:cancel", &workspace.full_path)?;

        if run.cancel_requested_at.is_none() {
            return Err(CoreError::invalid(format!(
                "run {} has not been canceled gracefully",
                run.id
            )));
        }

        let plan = tx.get_plan(run.plan_id.as_str())?;
        if !plan.status.is_terminal() {
            let mut plan = plan;
            plan.status = PlanStatus::Canceled;
            self.update_plan_in(&mut tx, cancel, plan).await?;
        } else if let Some(apply_id) = &run.apply_id {
            let apply = tx.get_apply(apply_id.as_str())?;
            if !apply.status.is_terminal() {
                let mut apply = apply;
                apply.status = ApplyStatus::Canceled;
                self.update_apply_in(&mut tx, cancel, apply).await?;
            }
        }

        // Re-read: the cascades above already advanced the run.
        let mut refreshed = tx.get_run(run_id.as_str())?;
        if !refreshed.force_canceled {
            refreshed.force_canceled = true;
            self.update_run_in(&mut tx, cancel, refreshed).await?;
        }

        let now = tx.now();
        tx.record_activity(ActivityEvent {
            action: "run.force_cancel".to_string(),
            target_table: EntityTable::Runs,
            target_id: run.id.to_string(),
            subject: caller.subject().to_string(),
            occurred_at: now,
        });
        tx.commit(cancel)?;
        self.database().get_run(run_id.as_str())
    }

    /// Claim a queued job on behalf of a worker.
    ///
    /// The `pending` transition acquires the workspace lock through the
    /// handler chain; a held lock fails the whole claim with a conflict
    /// and the job stays queued.
    pub async fn claim_job(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        job_id: &JobId,
    ) -> Result<Job> {
        let mut tx = self.database().begin(cancel)?;
        let job = tx.get_job(job_id.as_str())?;
        let workspace = tx.get_workspace(job.workspace_id.as_str())?;
        caller.require_permission("job:claim", &workspace.full_path)?;

        if job.status != JobStatus::Queued {
            return Err(CoreError::conflict(format!(
                "job {} is not queued (status {})",
                job.id, job.status
            )));
        }

        let mut claimed = job;
        claimed.status = JobStatus::Pending;
        let claimed = self.update_job_in(&mut tx, cancel, claimed).await?;
        tx.commit(cancel)?;

        tracing::info!(job = %claimed.id, worker = caller.subject(), "job claimed");
        Ok(claimed)
    }

    /// Flag a running job so its worker winds the phase down.
    pub async fn request_job_cancellation(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        job_id: &JobId,
    ) -> Result<Job> {
        let mut tx = self.database().begin(cancel)?;
        let job = tx.get_job(job_id.as_str())?;
        let workspace = tx.get_workspace(job.workspace_id.as_str())?;
        caller.require_permission("run:cancel", &workspace.full_path)?;

        let mut flagged = job;
        flagged.cancel_requested = true;
        let flagged = self.update_job_in(&mut tx, cancel, flagged).await?;
        tx.commit(cancel)?;
        Ok(flagged)
    }

    /// Upsert the workspace's assessment row before an assessment run
    /// starts; the terminal-run handler requires it to exist.
    pub async fn start_assessment(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        workspace_id: &WorkspaceId,
    ) -> Result<WorkspaceAssessment> {
        let mut tx = self.database().begin(cancel)?;
        let workspace = tx.get_workspace(workspace_id.as_str())?;
        caller.require_permission("workspace:assess", &workspace.full_path)?;

        let now = tx.now();
        let assessment = match tx.assessment_for_workspace(&workspace.id) {
            Some(mut existing) => {
                existing.started_at = now;
                existing.completed_at = None;
                tx.update_assessment(existing)?
            }
            None => tx.insert_assessment(WorkspaceAssessment {
                id: WorkspaceAssessmentId::new(),
                metadata: RowMetadata::default(),
                workspace_id: workspace.id,
                has_drift: false,
                requires_notification: false,
                started_at: now,
                completed_at: None,
                run_id: None,
            })?,
        };
        tx.commit(cancel)?;
        Ok(assessment)
    }

    /// Queue a job for one phase of a run.
    fn queue_job(
        &self,
        tx: &mut Transaction<'_>,
        run: &Run,
        workspace: &Workspace,
        kind: JobType,
    ) -> Result<Job> {
        tx.insert_job(Job {
            id: JobId::new(),
            metadata: RowMetadata::default(),
            run_id: run.id,
            workspace_id: workspace.id,
            kind,
            status: JobStatus::Queued,
            cancel_requested: false,
            timestamps: JobTimestamps {
                queued_at: tx.now(),
                running_at: None,
                finished_at: None,
            },
            max_job_duration: workspace.max_job_duration,
        })
    }

    /// Stamp the graceful-cancel request on the run and flag the
    /// claimed job of the active phase.
    async fn request_graceful_cancel(
        &self,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        mut run: Run,
        kind: JobType,
    ) -> Result<()> {
        run.cancel_requested_at = Some(tx.now());
        let run = self.update_run_in(tx, cancel, run).await?;
        if let Some(mut job) = tx.latest_job_for_run(&run.id, kind) {
            if !job.cancel_requested {
                job.cancel_requested = true;
                self.update_job_in(tx, cancel, job).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
