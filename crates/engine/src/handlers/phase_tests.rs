// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_support::fixture;
use rw_core::{ApplyStatus, PlanStatus, SystemCaller};

#[tokio::test(start_paused = true)]
async fn claiming_a_plan_job_moves_the_plan_to_pending() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, true).await;

    assert_eq!(f.db.get_plan(run.plan_id.as_str()).unwrap().status, PlanStatus::Queued);

    f.claim_plan_job(&run).await;
    assert_eq!(f.db.get_plan(run.plan_id.as_str()).unwrap().status, PlanStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn claiming_an_apply_job_moves_the_apply_to_pending() {
    let f = fixture();
    let workspace = f.seed_workspace();
    let run = f.seed_run(&workspace, false).await;
    f.finish_plan(&run, true).await;
    f.mgr.apply_run(&f.cancel, &SystemCaller, &run.id).await.unwrap();

    let job = f.latest_apply_job(&run).unwrap();
    f.mgr.claim_job(&f.cancel, &SystemCaller, &job.id).await.unwrap();

    let apply = f.db.get_apply(run.apply_id.unwrap().as_str()).unwrap();
    assert_eq!(apply.status, ApplyStatus::Pending);
}
