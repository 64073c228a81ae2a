// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::bare_fixture;
use async_trait::async_trait;
use rw_core::{CoreError, ErrorKind, Run, RunStatus};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Handler that fails with a fixed error a set number of times, then
/// succeeds, recording every invocation.
struct Flaky {
    failures: u32,
    kind: ErrorKind,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl ChangeHandler<Run> for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn handle(
        &self,
        _mgr: &RunStateManager,
        _tx: &mut Transaction<'_>,
        _cancel: &CancellationToken,
        _change: &Change<Run>,
    ) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(CoreError::new(self.kind, "induced failure"))
        } else {
            Ok(())
        }
    }
}

/// Handler that appends its tag to a shared log.
struct Tagged {
    tag: &'static str,
    log: Arc<parking_lot::Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl ChangeHandler<Run> for Tagged {
    fn name(&self) -> &'static str {
        self.tag
    }

    async fn handle(
        &self,
        _mgr: &RunStateManager,
        _tx: &mut Transaction<'_>,
        _cancel: &CancellationToken,
        _change: &Change<Run>,
    ) -> Result<()> {
        self.log.lock().push(self.tag);
        Ok(())
    }
}

async fn seeded_run(f: &crate::test_support::Fixture) -> Run {
    let workspace = f.seed_workspace();
    f.seed_run(&workspace, true).await
}

#[tokio::test(start_paused = true)]
async fn handlers_run_in_registration_order() {
    let mut f = bare_fixture();
    let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
    f.mgr.register_run_handler(Tagged { tag: "first", log: Arc::clone(&log) });
    f.mgr.register_run_handler(Tagged { tag: "second", log: Arc::clone(&log) });
    f.mgr.register_run_handler(Tagged { tag: "third", log: Arc::clone(&log) });

    let run = seeded_run(&f).await;
    let mut planning = f.run(&run);
    planning.status = RunStatus::Planning;
    f.mgr.update_run(&f.cancel, planning).await.unwrap();

    assert_eq!(*log.lock(), ["first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn optimistic_lock_errors_are_retried_to_success() {
    let mut f = bare_fixture();
    let calls = Arc::new(AtomicU32::new(0));
    f.mgr.register_run_handler(Flaky {
        failures: 99,
        kind: ErrorKind::OptimisticLock,
        calls: Arc::clone(&calls),
    });

    let run = seeded_run(&f).await;
    let mut planning = f.run(&run);
    planning.status = RunStatus::Planning;
    f.mgr.update_run(&f.cancel, planning).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 100);
    assert_eq!(f.run(&run).status, RunStatus::Planning);
}

#[tokio::test(start_paused = true)]
async fn optimistic_lock_escapes_after_exhaustion() {
    let mut f = bare_fixture();
    let calls = Arc::new(AtomicU32::new(0));
    f.mgr.register_run_handler(Flaky {
        failures: u32::MAX,
        kind: ErrorKind::OptimisticLock,
        calls: Arc::clone(&calls),
    });

    let run = seeded_run(&f).await;
    let mut planning = f.run(&run);
    planning.status = RunStatus::Planning;
    let err = f.mgr.update_run(&f.cancel, planning).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OptimisticLock);
    assert_eq!(calls.load(Ordering::SeqCst), 100);
    // The aborted update never committed.
    assert_eq!(f.run(&run).status, RunStatus::PlanQueued);
}

#[tokio::test(start_paused = true)]
async fn other_errors_fail_fast() {
    let mut f = bare_fixture();
    let calls = Arc::new(AtomicU32::new(0));
    f.mgr.register_run_handler(Flaky {
        failures: u32::MAX,
        kind: ErrorKind::Conflict,
        calls: Arc::clone(&calls),
    });

    let run = seeded_run(&f).await;
    let mut planning = f.run(&run);
    planning.status = RunStatus::Planning;
    let err = f.mgr.update_run(&f.cancel, planning).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_retries_with_the_last_error() {
    let mut f = bare_fixture();
    let calls = Arc::new(AtomicU32::new(0));
    f.mgr.register_run_handler(Flaky {
        failures: u32::MAX,
        kind: ErrorKind::OptimisticLock,
        calls: Arc::clone(&calls),
    });

    let run = seeded_run(&f).await;
    f.cancel.cancel();
    let mut planning = f.run(&run);
    planning.status = RunStatus::Planning;
    let err = f.mgr.update_run(&f.cancel, planning).await.unwrap_err();

    // begin() already observes the canceled token.
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_retry_stops_the_loop() {
    let mut f = bare_fixture();
    let calls = Arc::new(AtomicU32::new(0));
    f.mgr.register_run_handler(Flaky {
        failures: u32::MAX,
        kind: ErrorKind::OptimisticLock,
        calls: Arc::clone(&calls),
    });

    let run = seeded_run(&f).await;
    let mut planning = f.run(&run);
    planning.status = RunStatus::Planning;

    let cancel = f.cancel.clone();
    let update = f.mgr.update_run(&cancel, planning);
    tokio::pin!(update);

    // Let a few retries happen, then cancel.
    tokio::select! {
        _ = &mut update => unreachable!("update cannot finish while the handler keeps failing"),
        _ = tokio::time::sleep(std::time::Duration::from_millis(35)) => {}
    }
    cancel.cancel();
    let err = update.await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OptimisticLock);
    assert!(calls.load(Ordering::SeqCst) < 100);
}

#[test]
fn default_retry_policy_matches_production_values() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 100);
    assert_eq!(policy.delay, std::time::Duration::from_millis(10));
}
