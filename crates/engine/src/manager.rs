// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional updates of Run, Plan, Apply, and Job.

use crate::handlers;
use crate::registry::{Change, ChangeHandler, Registry, RetryPolicy};
use rw_core::{Apply, Job, Plan, Result, Run};
use rw_store::{Database, Transaction};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Coordinator for every run-related state change.
///
/// Each `update_*` operation opens a transaction, loads the old entity,
/// validates the transition, writes the new entity, fires the handlers
/// registered for that entity kind within the same transaction, and
/// commits. Handlers cascade further updates recursively; the transition
/// validators forbid returning to a prior status, so every cascade
/// terminates.
pub struct RunStateManager {
    db: Arc<Database>,
    run_handlers: Registry<Run>,
    plan_handlers: Registry<Plan>,
    apply_handlers: Registry<Apply>,
    job_handlers: Registry<Job>,
}

impl RunStateManager {
    /// Manager with the full production handler catalog.
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_retry(db, RetryPolicy::default())
    }

    pub fn with_retry(db: Arc<Database>, retry: RetryPolicy) -> Self {
        let mut mgr = Self::bare_with_retry(db, retry);
        mgr.register_plan_handler(handlers::run::PlanRunCascade);
        mgr.register_plan_handler(handlers::job::JobMirrorOnPlan);
        mgr.register_apply_handler(handlers::run::ApplyRunCascade);
        mgr.register_apply_handler(handlers::job::JobMirrorOnApply);
        mgr.register_job_handler(handlers::phase::PhasePendingOnJob);
        mgr.register_job_handler(handlers::workspace::WorkspaceLockOnJob);
        mgr.register_run_handler(handlers::run::ApplySettleOnRun);
        mgr.register_run_handler(handlers::workspace::WorkspaceDirtyOnRun);
        mgr.register_run_handler(handlers::assessment::AssessmentOnRun);
        mgr
    }

    /// Manager with no handlers registered. Tests compose their own.
    pub fn bare(db: Arc<Database>) -> Self {
        Self::bare_with_retry(db, RetryPolicy::default())
    }

    pub fn bare_with_retry(db: Arc<Database>, retry: RetryPolicy) -> Self {
        Self {
            db,
            run_handlers: Registry::new(retry.clone()),
            plan_handlers: Registry::new(retry.clone()),
            apply_handlers: Registry::new(retry.clone()),
            job_handlers: Registry::new(retry),
        }
    }

    pub fn register_run_handler(&mut self, handler: impl ChangeHandler<Run> + 'static) {
        self.run_handlers.register(handler);
    }

    pub fn register_plan_handler(&mut self, handler: impl ChangeHandler<Plan> + 'static) {
        self.plan_handlers.register(handler);
    }

    pub fn register_apply_handler(&mut self, handler: impl ChangeHandler<Apply> + 'static) {
        self.apply_handlers.register(handler);
    }

    pub fn register_job_handler(&mut self, handler: impl ChangeHandler<Job> + 'static) {
        self.job_handlers.register(handler);
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Persist a run update and fire the run handlers.
    pub async fn update_run(&self, cancel: &CancellationToken, run: Run) -> Result<Run> {
        let mut tx = self.db.begin(cancel)?;
        let updated = self.update_run_in(&mut tx, cancel, run).await?;
        tx.commit(cancel)?;
        Ok(updated)
    }

    /// Persist a plan update and fire the plan handlers.
    pub async fn update_plan(&self, cancel: &CancellationToken, plan: Plan) -> Result<Plan> {
        let mut tx = self.db.begin(cancel)?;
        let updated = self.update_plan_in(&mut tx, cancel, plan).await?;
        tx.commit(cancel)?;
        Ok(updated)
    }

    /// Persist an apply update and fire the apply handlers.
    pub async fn update_apply(&self, cancel: &CancellationToken, apply: Apply) -> Result<Apply> {
        let mut tx = self.db.begin(cancel)?;
        let updated = self.update_apply_in(&mut tx, cancel, apply).await?;
        tx.commit(cancel)?;
        Ok(updated)
    }

    /// Persist a job update and fire the job handlers.
    pub async fn update_job(&self, cancel: &CancellationToken, job: Job) -> Result<Job> {
        let mut tx = self.db.begin(cancel)?;
        let updated = self.update_job_in(&mut tx, cancel, job).await?;
        tx.commit(cancel)?;
        Ok(updated)
    }

    pub(crate) async fn update_run_in(
        &self,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        run: Run,
    ) -> Result<Run> {
        let old = tx.get_run(run.id.as_str())?;
        old.status.validate_transition(run.status)?;
        let new = tx.update_run(run)?;
        tracing::debug!(run = %new.id, from = %old.status, to = %new.status, "run updated");
        let change = Change { old, new: new.clone() };
        self.run_handlers.fire(self, tx, cancel, &change).await?;
        Ok(new)
    }

    pub(crate) async fn update_plan_in(
        &self,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        plan: Plan,
    ) -> Result<Plan> {
        let old = tx.get_plan(plan.id.as_str())?;
        old.status.validate_transition(plan.status)?;
        let new = tx.update_plan(plan)?;
        tracing::debug!(plan = %new.id, from = %old.status, to = %new.status, "plan updated");
        let change = Change { old, new: new.clone() };
        self.plan_handlers.fire(self, tx, cancel, &change).await?;
        Ok(new)
    }

    pub(crate) async fn update_apply_in(
        &self,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        apply: Apply,
    ) -> Result<Apply> {
        let old = tx.get_apply(apply.id.as_str())?;
        old.status.validate_transition(apply.status)?;
        let new = tx.update_apply(apply)?;
        tracing::debug!(apply = %new.id, from = %old.status, to = %new.status, "apply updated");
        let change = Change { old, new: new.clone() };
        self.apply_handlers.fire(self, tx, cancel, &change).await?;
        Ok(new)
    }

    // Jobs carry no transition validator; their lifecycle is policed
    // indirectly by the plan/apply machines and the workspace handler.
    pub(crate) async fn update_job_in(
        &self,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        job: Job,
    ) -> Result<Job> {
        let old = tx.get_job(job.id.as_str())?;
        let new = tx.update_job(job)?;
        tracing::debug!(job = %new.id, from = %old.status, to = %new.status, "job updated");
        let change = Change { old, new: new.clone() };
        self.job_handlers.fire(self, tx, cancel, &change).await?;
        Ok(new)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
