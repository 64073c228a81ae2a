// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rw-core: Domain model for the Runway run-orchestration core

pub mod macros;

pub mod apply;
pub mod assessment;
pub mod caller;
pub mod change;
pub mod clock;
pub mod configuration_version;
pub mod error;
pub mod id;
pub mod job;
pub mod metadata;
pub mod metrics;
pub mod plan;
pub mod run;
pub mod state_version;
pub mod workspace;

pub use apply::{Apply, ApplyId, ApplyStatus};
pub use assessment::{WorkspaceAssessment, WorkspaceAssessmentId};
pub use caller::{Caller, SystemCaller};
pub use change::{ChangeAction, ChangeEvent, EntityTable};
pub use clock::{Clock, FakeClock, SystemClock};
pub use configuration_version::{
    ConfigurationVersion, ConfigurationVersionId, ConfigurationVersionStatus,
};
pub use error::{CoreError, ErrorKind, Result};
pub use id::gid;
pub use job::{Job, JobId, JobStatus, JobTimestamps, JobType};
pub use metadata::RowMetadata;
pub use plan::{Plan, PlanId, PlanStatus, PlanSummary};
pub use run::{Run, RunId, RunStatus};
pub use state_version::{
    StateVersion, StateVersionId, StateVersionOutput, StateVersionOutputId,
};
pub use workspace::{Workspace, WorkspaceId};

#[cfg(any(test, feature = "test-support"))]
pub use caller::DenyingCaller;
