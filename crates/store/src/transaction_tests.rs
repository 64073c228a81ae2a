// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rw_core::{Clock, ErrorKind, FakeClock, JobStatus, PlanStatus, RunStatus};
use std::sync::Arc;

fn db() -> Database {
    Database::with_clock(Arc::new(FakeClock::new()))
}

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

#[test]
fn insert_stamps_metadata_and_commit_persists() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let run = tx.insert_run(Run::builder().build()).unwrap();
    assert_eq!(run.metadata.version, 1);
    tx.commit(&cancel()).unwrap();

    let found = db.get_run(run.id.as_str()).unwrap();
    assert_eq!(found, run);
}

#[test]
fn uncommitted_writes_are_invisible() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let run = tx.insert_run(Run::builder().build()).unwrap();

    assert_eq!(db.get_run(run.id.as_str()).unwrap_err().kind(), ErrorKind::NotFound);

    tx.rollback();
    assert_eq!(db.get_run(run.id.as_str()).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn reads_see_own_staged_writes() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let run = tx.insert_run(Run::builder().build()).unwrap();

    let found = tx.get_run(run.id.as_str()).unwrap();
    assert_eq!(found, run);

    let mut updated = found;
    updated.status = RunStatus::Planning;
    let updated = tx.update_run(updated).unwrap();
    assert_eq!(updated.metadata.version, 2);
    assert_eq!(tx.get_run(run.id.as_str()).unwrap().status, RunStatus::Planning);
}

#[test]
fn update_with_stale_version_is_optimistic_lock() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let run = tx.insert_run(Run::builder().build()).unwrap();
    tx.commit(&cancel()).unwrap();

    let mut tx = db.begin(&cancel()).unwrap();
    let mut current = tx.get_run(run.id.as_str()).unwrap();
    current.status = RunStatus::Planning;
    tx.update_run(current.clone()).unwrap();

    // The same pre-update copy is now one version behind the overlay.
    let mut stale = current;
    stale.status = RunStatus::Errored;
    let err = tx.update_run(stale).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OptimisticLock);
}

#[test]
fn update_of_missing_row_is_not_found() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let err = tx.update_run(Run::builder().build()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn duplicate_insert_is_conflict() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let run = tx.insert_run(Run::builder().id("run-dup").build()).unwrap();
    let err = tx.insert_run(Run::builder().id(run.id).build()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn interleaved_commit_is_detected() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let run = tx.insert_run(Run::builder().build()).unwrap();
    tx.commit(&cancel()).unwrap();

    let mut first = db.begin(&cancel()).unwrap();
    let mut second = db.begin(&cancel()).unwrap();

    let mut from_first = first.get_run(run.id.as_str()).unwrap();
    from_first.status = RunStatus::Planning;
    first.update_run(from_first).unwrap();

    let mut from_second = second.get_run(run.id.as_str()).unwrap();
    from_second.status = RunStatus::Errored;
    second.update_run(from_second).unwrap();

    first.commit(&cancel()).unwrap();
    let err = second.commit(&cancel()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OptimisticLock);

    assert_eq!(db.get_run(run.id.as_str()).unwrap().status, RunStatus::Planning);
}

#[test]
fn commit_is_refused_after_cancellation() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let run = tx.insert_run(Run::builder().build()).unwrap();

    let canceled = cancel();
    canceled.cancel();
    assert!(tx.commit(&canceled).is_err());
    assert_eq!(db.get_run(run.id.as_str()).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn run_for_plan_and_apply_finders() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let plan = tx.insert_plan(Plan::builder().build()).unwrap();
    let apply = tx.insert_apply(Apply::builder().build()).unwrap();
    let run = tx
        .insert_run(Run::builder().plan_id(plan.id).apply_id(apply.id).build())
        .unwrap();

    assert_eq!(tx.run_for_plan(&plan.id).unwrap().id, run.id);
    assert_eq!(tx.run_for_apply(&apply.id).unwrap().id, run.id);
    assert_eq!(
        tx.run_for_plan(&PlanId::from_string("plan-none")).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn latest_job_prefers_most_recent_queued_at() {
    let clock = FakeClock::new();
    let db = Database::with_clock(Arc::new(clock.clone()));
    let run_id = RunId::new();

    let mut tx = db.begin(&cancel()).unwrap();
    let mut early = Job::builder().run_id(run_id).build();
    early.timestamps.queued_at = clock.now_utc();
    tx.insert_job(early).unwrap();

    clock.advance(std::time::Duration::from_secs(60));
    let mut late = Job::builder().run_id(run_id).build();
    late.timestamps.queued_at = clock.now_utc();
    let late = tx.insert_job(late).unwrap();

    let found = tx.latest_job_for_run(&run_id, JobType::Plan).unwrap();
    assert_eq!(found.id, late.id);
    assert!(tx.latest_job_for_run(&run_id, JobType::Apply).is_none());
}

#[test]
fn delete_assessment_removes_row() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let asmt = tx.insert_assessment(WorkspaceAssessment::builder().build()).unwrap();
    tx.commit(&cancel()).unwrap();

    let mut tx = db.begin(&cancel()).unwrap();
    tx.delete_assessment(asmt.id.as_str()).unwrap();
    assert_eq!(tx.get_assessment(asmt.id.as_str()).unwrap_err().kind(), ErrorKind::NotFound);
    assert!(tx.assessment_for_workspace(&asmt.workspace_id).is_none());
    tx.commit(&cancel()).unwrap();

    assert!(db.assessment_for_workspace(asmt.workspace_id.as_str()).is_none());
}

#[test]
fn plan_status_update_round_trip() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let plan = tx.insert_plan(Plan::builder().build()).unwrap();
    tx.commit(&cancel()).unwrap();

    let mut tx = db.begin(&cancel()).unwrap();
    let mut current = tx.get_plan(plan.id.as_str()).unwrap();
    current.status = PlanStatus::Pending;
    tx.update_plan(current).unwrap();
    tx.commit(&cancel()).unwrap();

    assert_eq!(db.get_plan(plan.id.as_str()).unwrap().status, PlanStatus::Pending);
}

#[test]
fn job_status_persists() {
    let db = db();
    let mut tx = db.begin(&cancel()).unwrap();
    let job = tx.insert_job(Job::builder().build()).unwrap();
    tx.commit(&cancel()).unwrap();

    assert_eq!(db.get_job(job.id.as_str()).unwrap().status, JobStatus::Queued);
}
