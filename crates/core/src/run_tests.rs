// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

const ALL: [RunStatus; 9] = [
    RunStatus::PlanQueued,
    RunStatus::ApplyQueued,
    RunStatus::Planning,
    RunStatus::Applying,
    RunStatus::Planned,
    RunStatus::PlannedAndFinished,
    RunStatus::Applied,
    RunStatus::Canceled,
    RunStatus::Errored,
];

fn is_legal(from: RunStatus, to: RunStatus) -> bool {
    use RunStatus::*;
    from == to
        || matches!(
            (from, to),
            (PlanQueued, Canceled | Errored | Planning)
                | (ApplyQueued, Canceled | Errored | Applying)
                | (Planning, Canceled | Errored | Planned | PlannedAndFinished)
                | (Applying, Canceled | Errored | Applied)
                | (Planned, Canceled | ApplyQueued)
        )
}

#[parameterized(
    plan_queued_to_planning = { RunStatus::PlanQueued, RunStatus::Planning },
    plan_queued_to_canceled = { RunStatus::PlanQueued, RunStatus::Canceled },
    plan_queued_to_errored = { RunStatus::PlanQueued, RunStatus::Errored },
    apply_queued_to_applying = { RunStatus::ApplyQueued, RunStatus::Applying },
    planning_to_planned = { RunStatus::Planning, RunStatus::Planned },
    planning_to_planned_and_finished = { RunStatus::Planning, RunStatus::PlannedAndFinished },
    applying_to_applied = { RunStatus::Applying, RunStatus::Applied },
    planned_to_apply_queued = { RunStatus::Planned, RunStatus::ApplyQueued },
    planned_to_canceled = { RunStatus::Planned, RunStatus::Canceled },
)]
fn legal_transitions(from: RunStatus, to: RunStatus) {
    assert!(from.validate_transition(to).is_ok());
}

#[parameterized(
    plan_queued_to_applied = { RunStatus::PlanQueued, RunStatus::Applied },
    planning_to_applying = { RunStatus::Planning, RunStatus::Applying },
    planned_to_applied = { RunStatus::Planned, RunStatus::Applied },
    applied_to_planning = { RunStatus::Applied, RunStatus::Planning },
    canceled_to_planning = { RunStatus::Canceled, RunStatus::Planning },
    errored_to_plan_queued = { RunStatus::Errored, RunStatus::PlanQueued },
    finished_to_apply_queued = { RunStatus::PlannedAndFinished, RunStatus::ApplyQueued },
)]
fn illegal_transitions(from: RunStatus, to: RunStatus) {
    let err = from.validate_transition(to).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Invalid);
    assert!(err.message().contains(&from.to_string()));
    assert!(err.message().contains(&to.to_string()));
}

#[test]
fn equality_is_always_valid() {
    for status in ALL {
        assert!(status.validate_transition(status).is_ok());
    }
}

#[test]
fn terminal_statuses() {
    for status in ALL {
        let expected = matches!(
            status,
            RunStatus::PlannedAndFinished
                | RunStatus::Applied
                | RunStatus::Canceled
                | RunStatus::Errored
        );
        assert_eq!(status.is_terminal(), expected, "{status}");
    }
}

#[test]
fn terminal_statuses_admit_nothing_else() {
    for from in ALL.into_iter().filter(|s| s.is_terminal()) {
        for to in ALL.into_iter().filter(|&to| to != from) {
            assert!(from.validate_transition(to).is_err(), "{from} -> {to}");
        }
    }
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
fn speculative_iff_apply_absent() {
    let speculative = Run::builder().build();
    assert!(speculative.speculative());

    let full = Run::builder().apply_id(ApplyId::new()).build();
    assert!(!full.speculative());
}

#[test]
fn status_serializes_camel_case() {
    let json = serde_json::to_string(&RunStatus::PlannedAndFinished).unwrap();
    assert_eq!(json, "\"plannedAndFinished\"");
    assert_eq!(serde_json::to_string(&RunStatus::PlanQueued).unwrap(), "\"planQueued\"");
}

#[test]
fn run_round_trips_through_json() {
    let run = Run::builder().has_changes(true).apply_id("appl-abc").build();
    let json = serde_json::to_string(&run).unwrap();
    let parsed: Run = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, run);
}
