// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan/apply → job timestamp mirroring.
//!
//! The latest job of the matching type follows its phase: a running
//! phase marks the job running and stamps `running_at`; a terminal
//! phase finishes the job and stamps `finished_at`. Once both stamps
//! are present the execution-time histogram is observed.

use crate::manager::RunStateManager;
use crate::registry::{Change, ChangeHandler};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rw_core::{metrics, Apply, Job, JobStatus, JobType, Plan, Result};
use rw_store::Transaction;
use tokio_util::sync::CancellationToken;

/// Mirror a phase change onto a job. Returns false when there is
/// nothing to mirror.
fn mirror_phase(job: &mut Job, running: bool, terminal: bool, now: DateTime<Utc>) -> bool {
    if running && job.status != JobStatus::Running {
        job.status = JobStatus::Running;
        if job.timestamps.running_at.is_none() {
            job.timestamps.running_at = Some(now);
        }
        true
    } else if terminal && job.status != JobStatus::Finished {
        job.status = JobStatus::Finished;
        if job.timestamps.finished_at.is_none() {
            job.timestamps.finished_at = Some(now);
        }
        true
    } else {
        false
    }
}

fn observe_execution(job: &Job) {
    if let Some(elapsed) = job.execution_time() {
        let histogram = match job.kind {
            JobType::Plan => &metrics::PLAN_EXECUTION_TIME,
            JobType::Apply => &metrics::APPLY_EXECUTION_TIME,
        };
        histogram.observe_ms(elapsed.as_millis() as u64);
    }
}

pub struct JobMirrorOnPlan;

#[async_trait]
impl ChangeHandler<Plan> for JobMirrorOnPlan {
    fn name(&self) -> &'static str {
        "job-mirror-on-plan"
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
        let run = tx.run_for_plan(&change.new.id)?;
        let Some(mut job) = tx.latest_job_for_run(&run.id, JobType::Plan) else {
            return Ok(());
        };

        let running = change.new.status == rw_core::PlanStatus::Running;
        let terminal = change.new.status.is_terminal();
        if mirror_phase(&mut job, running, terminal, tx.now()) {
            let job = mgr.update_job_in(tx, cancel, job).await?;
            if terminal {
                observe_execution(&job);
            }
        }
        Ok(())
    }
}

pub struct JobMirrorOnApply;

#[async_trait]
impl ChangeHandler<Apply> for JobMirrorOnApply {
    fn name(&self) -> &'static str {
        "job-mirror-on-apply"
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
        let run = tx.run_for_apply(&change.new.id)?;
        let Some(mut job) = tx.latest_job_for_run(&run.id, JobType::Apply) else {
            return Ok(());
        };

        let running = change.new.status == rw_core::ApplyStatus::Running;
        let terminal = change.new.status.is_terminal();
        if mirror_phase(&mut job, running, terminal, tx.now()) {
            let job = mgr.update_job_in(tx, cancel, job).await?;
            if terminal {
                observe_execution(&job);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
