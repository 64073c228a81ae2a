// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

const ALL: [ApplyStatus; 7] = [
    ApplyStatus::Created,
    ApplyStatus::Queued,
    ApplyStatus::Pending,
    ApplyStatus::Running,
    ApplyStatus::Canceled,
    ApplyStatus::Errored,
    ApplyStatus::Finished,
];

fn is_legal(from: ApplyStatus, to: ApplyStatus) -> bool {
    use ApplyStatus::*;
    from == to
        || matches!(
            (from, to),
            (Created, Queued | Canceled)
                | (Queued, Pending | Canceled)
                | (Pending, Running | Canceled)
                | (Running, Canceled | Errored | Finished)
        )
}

#[parameterized(
    created_to_queued = { ApplyStatus::Created, ApplyStatus::Queued },
    created_to_canceled = { ApplyStatus::Created, ApplyStatus::Canceled },
    queued_to_pending = { ApplyStatus::Queued, ApplyStatus::Pending },
    pending_to_running = { ApplyStatus::Pending, ApplyStatus::Running },
    running_to_finished = { ApplyStatus::Running, ApplyStatus::Finished },
    running_to_errored = { ApplyStatus::Running, ApplyStatus::Errored },
)]
fn legal_transitions(from: ApplyStatus, to: ApplyStatus) {
    assert!(from.validate_transition(to).is_ok());
}

#[parameterized(
    created_to_running = { ApplyStatus::Created, ApplyStatus::Running },
    created_to_pending = { ApplyStatus::Created, ApplyStatus::Pending },
    queued_to_running = { ApplyStatus::Queued, ApplyStatus::Running },
    pending_to_finished = { ApplyStatus::Pending, ApplyStatus::Finished },
    finished_to_created = { ApplyStatus::Finished, ApplyStatus::Created },
    canceled_to_running = { ApplyStatus::Canceled, ApplyStatus::Running },
)]
fn illegal_transitions(from: ApplyStatus, to: ApplyStatus) {
    let err = from.validate_transition(to).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Invalid);
}

#[test]
fn equality_is_always_valid() {
    for status in ALL {
        assert!(status.validate_transition(status).is_ok());
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
