// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process database with a commit-time change feed.

use crate::activity::ActivityEvent;
use crate::entity::Entity;
use crate::tables::Tables;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rw_core::{
    Apply, ChangeEvent, Clock, ConfigurationVersion, CoreError, EntityTable, Job, Plan, Result,
    Run, StateVersion, StateVersionOutput, SystemClock, Workspace, WorkspaceAssessment,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A listen stream opened with [`Database::listen`].
///
/// `events` carries row-level changes in commit order; `errors` carries
/// stream failures. When either closes the stream is dead and must be
/// reopened.
pub struct ListenStream {
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
    pub errors: mpsc::UnboundedReceiver<CoreError>,
}

struct Listener {
    events: mpsc::UnboundedSender<ChangeEvent>,
    errors: mpsc::UnboundedSender<CoreError>,
}

/// The backing store: versioned rows behind transactions, plus a change
/// feed fed on commit.
///
/// Change events are buffered by the [`Transaction`] and only reach
/// listeners when it commits; a dropped transaction publishes nothing.
pub struct Database {
    clock: Arc<dyn Clock>,
    tables: Mutex<Tables>,
    listeners: Mutex<Vec<Listener>>,
}

impl Database {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tables: Mutex::new(Tables::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Open a transaction.
    pub fn begin(&self, cancel: &CancellationToken) -> Result<Transaction<'_>> {
        if cancel.is_cancelled() {
            return Err(CoreError::internal("transaction canceled before begin"));
        }
        Ok(Transaction::new(self))
    }

    /// Open a listen stream over row-level change events.
    ///
    /// Every committed transaction fans its events to all open streams;
    /// ordering within one stream matches commit order.
    pub fn listen(&self) -> ListenStream {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(Listener { events: events_tx, errors: errors_tx });
        ListenStream { events: events_rx, errors: errors_rx }
    }

    /// Committed activity records, oldest first.
    pub fn activity(&self) -> Vec<ActivityEvent> {
        self.tables().activity.clone()
    }

    pub(crate) fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    /// Apply a transaction's staged writes.
    ///
    /// Re-validates every touched row against the version observed when
    /// the transaction first staged it; any interleaved commit surfaces
    /// as an optimistic-lock error and nothing is applied.
    pub(crate) fn apply(
        &self,
        staged: Tables,
        deleted: HashSet<(EntityTable, String)>,
        base_versions: HashMap<(EntityTable, String), Option<u64>>,
        events: Vec<ChangeEvent>,
    ) -> Result<()> {
        let mut tables = self.tables.lock();
        for ((table, id), base) in &base_versions {
            if tables.version_of(*table, id) != *base {
                return Err(CoreError::optimistic_lock(format!(
                    "{} {} was modified by a concurrent transaction",
                    table, id
                )));
            }
        }

        tables.runs.extend(staged.runs);
        tables.plans.extend(staged.plans);
        tables.applies.extend(staged.applies);
        tables.jobs.extend(staged.jobs);
        tables.workspaces.extend(staged.workspaces);
        tables.state_versions.extend(staged.state_versions);
        tables.state_version_outputs.extend(staged.state_version_outputs);
        tables.configuration_versions.extend(staged.configuration_versions);
        tables.assessments.extend(staged.assessments);
        for (table, id) in &deleted {
            tables.remove(*table, id);
        }
        tables.activity.extend(staged.activity);

        // Publish before releasing the table lock so stream order
        // matches commit order across concurrent committers.
        self.publish(&events);
        Ok(())
    }

    fn publish(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| {
            for event in events {
                if listener.events.send(event.clone()).is_err() {
                    return false;
                }
            }
            true
        });
    }

    /// Fail every open listen stream with an error and close it.
    ///
    /// Simulates the production store dropping its replication
    /// connection; consumers are expected to reopen via [`listen`].
    ///
    /// [`listen`]: Self::listen
    #[cfg(any(test, feature = "test-support"))]
    pub fn interrupt_listeners(&self) {
        let drained: Vec<Listener> = std::mem::take(&mut *self.listeners.lock());
        for listener in &drained {
            let _ = listener
                .errors
                .send(CoreError::internal("listen stream interrupted"));
        }
        // Dropping the senders closes the event channels.
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! db_finder {
    ($entity:ty, $table:ident, $get:ident) => {
        impl Database {
            /// Read a committed row without opening a transaction.
            pub fn $get(&self, id: &str) -> Result<$entity> {
                self.tables().$table.get(id).cloned().ok_or_else(|| {
                    CoreError::not_found(format!(
                        "{} {} not found",
                        <$entity as Entity>::TABLE,
                        id
                    ))
                })
            }
        }
    };
}

db_finder!(Run, runs, get_run);
db_finder!(Plan, plans, get_plan);
db_finder!(Apply, applies, get_apply);
db_finder!(Job, jobs, get_job);
db_finder!(Workspace, workspaces, get_workspace);
db_finder!(StateVersion, state_versions, get_state_version);
db_finder!(ConfigurationVersion, configuration_versions, get_configuration_version);
db_finder!(WorkspaceAssessment, assessments, get_assessment);

impl Database {
    /// Committed outputs for a state version, sorted by name.
    pub fn outputs_for_state_version(&self, state_version_id: &str) -> Vec<StateVersionOutput> {
        let mut outputs: Vec<StateVersionOutput> = self
            .tables()
            .state_version_outputs
            .values()
            .filter(|o| o.state_version_id == state_version_id)
            .cloned()
            .collect();
        outputs.sort_by(|a, b| a.name.cmp(&b.name));
        outputs
    }

    /// The committed run owning a plan.
    pub fn run_for_plan(&self, plan_id: &str) -> Result<Run> {
        self.tables()
            .runs
            .values()
            .find(|r| r.plan_id == plan_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("run owning plan {} not found", plan_id)))
    }

    /// Committed assessment row for a workspace, if any.
    pub fn assessment_for_workspace(&self, workspace_id: &str) -> Option<WorkspaceAssessment> {
        self.tables()
            .assessments
            .values()
            .find(|a| a.workspace_id == workspace_id)
            .cloned()
    }
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod tests;
