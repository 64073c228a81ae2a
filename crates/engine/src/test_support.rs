// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::manager::RunStateManager;
use crate::service::CreateRunInput;
use rw_core::{
    Apply, ApplyStatus, FakeClock, Job, Plan, PlanStatus, Result, Run, SystemCaller, Workspace,
};
use rw_store::Database;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) struct Fixture {
    pub db: Arc<Database>,
    pub mgr: RunStateManager,
    pub cancel: CancellationToken,
    pub clock: FakeClock,
}

/// Honor RUST_LOG when set, so failing cascades can be traced.
fn init_logging() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fixture with the full production handler catalog.
pub(crate) fn fixture() -> Fixture {
    init_logging();
    let clock = FakeClock::new();
    let db = Arc::new(Database::with_clock(Arc::new(clock.clone())));
    let mgr = RunStateManager::new(Arc::clone(&db));
    Fixture { db, mgr, cancel: CancellationToken::new(), clock }
}

/// Fixture with no handlers registered.
pub(crate) fn bare_fixture() -> Fixture {
    init_logging();
    let clock = FakeClock::new();
    let db = Arc::new(Database::with_clock(Arc::new(clock.clone())));
    let mgr = RunStateManager::bare(Arc::clone(&db));
    Fixture { db, mgr, cancel: CancellationToken::new(), clock }
}

impl Fixture {
    pub fn seed_workspace(&self) -> Workspace {
        let mut tx = self.db.begin(&self.cancel).unwrap();
        let workspace = tx.insert_workspace(Workspace::builder().build()).unwrap();
        tx.commit(&self.cancel).unwrap();
        workspace
    }

    pub async fn seed_run(&self, workspace: &Workspace, speculative: bool) -> Run {
        let mut input = CreateRunInput::new(workspace.id);
        input.speculative = speculative;
        self.mgr.create_run(&self.cancel, &SystemCaller, input).await.unwrap()
    }

    pub async fn seed_assessment_run(&self, workspace: &Workspace) -> Run {
        self.mgr
            .start_assessment(&self.cancel, &SystemCaller, &workspace.id)
            .await
            .unwrap();
        let mut input = CreateRunInput::new(workspace.id);
        input.speculative = true;
        input.is_assessment_run = true;
        self.mgr.create_run(&self.cancel, &SystemCaller, input).await.unwrap()
    }

    pub async fn set_plan_status(&self, run: &Run, status: PlanStatus) -> Result<Plan> {
        let mut plan = self.db.get_plan(run.plan_id.as_str())?;
        plan.status = status;
        self.mgr.update_plan(&self.cancel, plan).await
    }

    pub async fn set_apply_status(&self, run: &Run, status: ApplyStatus) -> Result<Apply> {
        let apply_id = run.apply_id.unwrap();
        let mut apply = self.db.get_apply(apply_id.as_str())?;
        apply.status = status;
        self.mgr.update_apply(&self.cancel, apply).await
    }

    pub async fn claim_plan_job(&self, run: &Run) -> Job {
        let job = self.latest_plan_job(run);
        self.mgr.claim_job(&self.cancel, &SystemCaller, &job.id).await.unwrap()
    }

    pub fn latest_plan_job(&self, run: &Run) -> Job {
        let tx = self.db.begin(&self.cancel).unwrap();
        tx.latest_job_for_run(&run.id, rw_core::JobType::Plan).unwrap()
    }

    pub fn latest_apply_job(&self, run: &Run) -> Option<Job> {
        let tx = self.db.begin(&self.cancel).unwrap();
        tx.latest_job_for_run(&run.id, rw_core::JobType::Apply)
    }

    pub fn run(&self, run: &Run) -> Run {
        self.db.get_run(run.id.as_str()).unwrap()
    }

    pub fn workspace(&self, workspace: &Workspace) -> Workspace {
        self.db.get_workspace(workspace.id.as_str()).unwrap()
    }

    /// Walk a freshly created run through claim → running → finished
    /// plan, leaving it planned (has_changes) or terminal.
    pub async fn finish_plan(&self, run: &Run, has_changes: bool) -> Run {
        self.claim_plan_job(run).await;
        self.set_plan_status(run, PlanStatus::Running).await.unwrap();
        let mut plan = self.db.get_plan(run.plan_id.as_str()).unwrap();
        plan.status = PlanStatus::Finished;
        plan.has_changes = has_changes;
        self.mgr.update_plan(&self.cancel, plan).await.unwrap();
        self.run(run)
    }

    /// Walk a planned run through confirmation and a finished apply.
    pub async fn finish_apply(&self, run: &Run) -> Run {
        self.mgr.apply_run(&self.cancel, &SystemCaller, &run.id).await.unwrap();
        let job = self.latest_apply_job(run).unwrap();
        self.mgr.claim_job(&self.cancel, &SystemCaller, &job.id).await.unwrap();
        self.set_apply_status(&self.run(run), ApplyStatus::Running).await.unwrap();
        self.set_apply_status(&self.run(run), ApplyStatus::Finished).await.unwrap();
        self.run(run)
    }

    /// A terminal run settles both of its phases.
    pub fn assert_terminal_consistency(&self, run: &Run) {
        let run = self.run(run);
        if run.status.is_terminal() {
            let plan = self.db.get_plan(run.plan_id.as_str()).unwrap();
            assert!(plan.status.is_terminal(), "terminal run with non-terminal plan");
            if let Some(apply_id) = &run.apply_id {
                let apply = self.db.get_apply(apply_id.as_str()).unwrap();
                assert!(
                    apply.status.is_terminal(),
                    "terminal run with in-flight apply ({})",
                    apply.status
                );
            }
        }
    }
}
