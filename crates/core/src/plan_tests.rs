// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

const ALL: [PlanStatus; 6] = [
    PlanStatus::Queued,
    PlanStatus::Pending,
    PlanStatus::Running,
    PlanStatus::Canceled,
    PlanStatus::Errored,
    PlanStatus::Finished,
];

fn is_legal(from: PlanStatus, to: PlanStatus) -> bool {
    use PlanStatus::*;
    from == to
        || matches!(
            (from, to),
            (Queued, Pending | Canceled)
                | (Pending, Running | Canceled)
                | (Running, Canceled | Errored | Finished)
        )
}

#[parameterized(
    queued_to_pending = { PlanStatus::Queued, PlanStatus::Pending },
    queued_to_canceled = { PlanStatus::Queued, PlanStatus::Canceled },
    pending_to_running = { PlanStatus::Pending, PlanStatus::Running },
    pending_to_canceled = { PlanStatus::Pending, PlanStatus::Canceled },
    running_to_canceled = { PlanStatus::Running, PlanStatus::Canceled },
    running_to_errored = { PlanStatus::Running, PlanStatus::Errored },
    running_to_finished = { PlanStatus::Running, PlanStatus::Finished },
)]
fn legal_transitions(from: PlanStatus, to: PlanStatus) {
    assert!(from.validate_transition(to).is_ok());
}

#[parameterized(
    queued_to_running = { PlanStatus::Queued, PlanStatus::Running },
    queued_to_finished = { PlanStatus::Queued, PlanStatus::Finished },
    pending_to_finished = { PlanStatus::Pending, PlanStatus::Finished },
    finished_to_running = { PlanStatus::Finished, PlanStatus::Running },
    canceled_to_queued = { PlanStatus::Canceled, PlanStatus::Queued },
    errored_to_finished = { PlanStatus::Errored, PlanStatus::Finished },
)]
fn illegal_transitions(from: PlanStatus, to: PlanStatus) {
    let err = from.validate_transition(to).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Invalid);
}

#[test]
fn equality_is_always_valid() {
    for status in ALL {
        assert!(status.validate_transition(status).is_ok());
    }
}

#[test]
fn terminal_statuses() {
    assert!(PlanStatus::Canceled.is_terminal());
    assert!(PlanStatus::Errored.is_terminal());
    assert!(PlanStatus::Finished.is_terminal());
    assert!(!PlanStatus::Queued.is_terminal());
    assert!(!PlanStatus::Pending.is_terminal());
    assert!(!PlanStatus::Running.is_terminal());
}

proptest! {
    #[test]
    fn validator_matches_transition_table(
        from in proptest::sample::select(&ALL[..]),
        to in proptest::sample::select(&ALL[..]),
    ) {
        prop_assert_eq!(from.validate_transition(to).is_ok(), is_legal(from, to));
    }
}

#[test]
fn summary_defaults_to_zero() {
    let plan = Plan::builder().build();
    assert_eq!(plan.summary, PlanSummary::default());
    assert_eq!(plan.summary.resource_drift, 0);
}
