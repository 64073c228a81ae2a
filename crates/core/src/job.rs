// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and entity.
//!
//! A job is the executable unit backing one phase of a run. External
//! workers claim a queued job by transitioning it to `pending`, which
//! acquires the workspace lock through the engine's handler chain. Jobs
//! carry no transition validator; their lifecycle is driven indirectly
//! by the plan and apply state machines.

use crate::metadata::RowMetadata;
use crate::run::RunId;
use crate::workspace::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Unique identifier for a job.
    pub struct JobId("job-");
}

/// Which run phase the job executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobType {
    Plan,
    Apply,
}

crate::simple_display! {
    JobType {
        Plan => "plan",
        Apply => "apply",
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Queued,
    Pending,
    Running,
    Finished,
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Pending => "pending",
        Running => "running",
        Finished => "finished",
    }
}

/// Phase timestamps mirrored from the plan/apply state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTimestamps {
    pub queued_at: DateTime<Utc>,
    pub running_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A job instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub metadata: RowMetadata,
    pub run_id: RunId,
    pub workspace_id: WorkspaceId,
    pub kind: JobType,
    pub status: JobStatus,
    /// Set by a graceful cancel; the claiming worker observes it and
    /// winds the phase down.
    pub cancel_requested: bool,
    pub timestamps: JobTimestamps,
    /// Maximum wall-clock minutes a worker may hold this job.
    pub max_job_duration: i32,
}

impl Job {
    /// Wall-clock execution time, available once both the running and
    /// finished timestamps are stamped.
    pub fn execution_time(&self) -> Option<Duration> {
        let running = self.timestamps.running_at?;
        let finished = self.timestamps.finished_at?;
        (finished - running).to_std().ok()
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = JobId::new(),
            run_id: RunId = RunId::new(),
            workspace_id: WorkspaceId = WorkspaceId::new(),
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
            kind: JobType = JobType::Plan,
            status: JobStatus = JobStatus::Queued,
            cancel_requested: bool = false,
            timestamps: JobTimestamps = JobTimestamps {
                queued_at: DateTime::<Utc>::UNIX_EPOCH,
                running_at: None,
                finished_at: None,
            },
            max_job_duration: i32 = 60,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
