// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::{Change, ChangeHandler};
use crate::test_support::{bare_fixture, fixture};
use async_trait::async_trait;
use rw_core::{CoreError, ErrorKind, JobStatus, PlanStatus, RunStatus};

#[tokio::test(start_paused = true)]
async fn update_validates_the_transition() {
    let f = bare_fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, true).await;

    let mut illegal = f.run(&run);
    illegal.status = RunStatus::Applied;
    let err = f.mgr.update_run(&f.cancel, illegal).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(f.run(&run).status, RunStatus::PlanQueued);
}

#[tokio::test(start_paused = true)]
async fn update_of_missing_entity_is_not_found() {
    let f = bare_fixture();
    let err = f
        .mgr
        .update_run(&f.cancel, rw_core::Run::builder().build())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn no_op_update_is_valid() {
    let f = bare_fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, true).await;

    // Same status, different field: equality transitions are no-ops.
    let mut same = f.run(&run);
    same.has_changes = true;
    let updated = f.mgr.update_run(&f.cancel, same).await.unwrap();
    assert!(updated.has_changes);
    assert_eq!(updated.status, RunStatus::PlanQueued);
}

/// Handler that always fails; used to prove handler failures abort the
/// originating update.
struct Failing;

#[async_trait]
impl ChangeHandler<rw_core::Plan> for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle(
        &self,
        _mgr: &RunStateManager,
        _tx: &mut rw_store::Transaction<'_>,
        _cancel: &tokio_util::sync::CancellationToken,
        _change: &Change<rw_core::Plan>,
    ) -> rw_core::Result<()> {
        Err(CoreError::internal("handler exploded"))
    }
}

#[tokio::test(start_paused = true)]
async fn handler_failure_aborts_the_whole_update() {
    let mut f = bare_fixture();
    f.mgr.register_plan_handler(Failing);
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, true).await;

    let mut plan = f.db.get_plan(run.plan_id.as_str()).unwrap();
    plan.status = PlanStatus::Canceled;
    let err = f.mgr.update_plan(&f.cancel, plan).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    // The plan write rolled back with the handler failure.
    assert_eq!(f.db.get_plan(run.plan_id.as_str()).unwrap().status, PlanStatus::Queued);
}

#[tokio::test(start_paused = true)]
async fn plan_finish_with_changes_marks_run_planned() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, false).await;

    let before = rw_core::metrics::PLAN_COMPLETED.value();
    let finished = f.finish_plan(&run, true).await;

    assert_eq!(finished.status, RunStatus::Planned);
    assert!(finished.has_changes);
    assert!(rw_core::metrics::PLAN_COMPLETED.value() > before);
}

#[tokio::test(start_paused = true)]
async fn speculative_plan_finish_marks_run_planned_and_finished() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, true).await;

    let finished = f.finish_plan(&run, true).await;

    assert_eq!(finished.status, RunStatus::PlannedAndFinished);
    assert!(finished.has_changes);
    f.assert_terminal_consistency(&run);
}

#[tokio::test(start_paused = true)]
async fn plan_finish_without_changes_finishes_the_run_and_settles_the_apply() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, false).await;

    let finished = f.finish_plan(&run, false).await;

    assert_eq!(finished.status, RunStatus::PlannedAndFinished);
    assert!(!finished.has_changes);
    f.assert_terminal_consistency(&run);

    let apply = f.db.get_apply(run.apply_id.unwrap().as_str()).unwrap();
    assert_eq!(apply.status, rw_core::ApplyStatus::Canceled);
}

#[tokio::test(start_paused = true)]
async fn plan_running_cascades_run_and_job() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, false).await;

    f.claim_plan_job(&run).await;
    f.set_plan_status(&run, PlanStatus::Running).await.unwrap();

    assert_eq!(f.run(&run).status, RunStatus::Planning);
    let job = f.latest_plan_job(&run);
    assert_eq!(job.status, JobStatus::Running);
    assert!(job.timestamps.running_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn plan_finish_releases_the_workspace_lock() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, true).await;

    f.claim_plan_job(&run).await;
    assert!(f.workspace(&workspace).locked);

    f.set_plan_status(&run, PlanStatus::Running).await.unwrap();
    f.finish_plan_status(&run).await;

    let after = f.workspace(&workspace);
    assert!(!after.locked);
    assert!(after.current_job_id.is_none());
    assert!(after.lock_is_consistent());

    let job = f.latest_plan_job(&run);
    assert_eq!(job.status, JobStatus::Finished);
    assert!(job.timestamps.finished_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn full_apply_path_reaches_applied() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, false).await;

    let planned = f.finish_plan(&run, true).await;
    assert_eq!(planned.status, RunStatus::Planned);

    let applied = f.finish_apply(&run).await;
    assert_eq!(applied.status, RunStatus::Applied);
    f.assert_terminal_consistency(&run);

    let after = f.workspace(&workspace);
    assert!(!after.locked);
}

#[tokio::test(start_paused = true)]
async fn plan_error_cascades_to_run_errored() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, false).await;

    f.claim_plan_job(&run).await;
    f.set_plan_status(&run, PlanStatus::Running).await.unwrap();
    f.set_plan_status(&run, PlanStatus::Errored).await.unwrap();

    assert_eq!(f.run(&run).status, RunStatus::Errored);
    f.assert_terminal_consistency(&run);
}

impl crate::test_support::Fixture {
    async fn finish_plan_status(&self, run: &rw_core::Run) {
        let mut plan = self.db.get_plan(run.plan_id.as_str()).unwrap();
        plan.status = PlanStatus::Finished;
        self.mgr.update_plan(&self.cancel, plan).await.unwrap();
    }
}
