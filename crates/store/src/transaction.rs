// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot transactions over the in-process database.
//!
//! Writes are staged in an overlay and change events buffered alongside
//! them; both become visible atomically on commit. Dropping a
//! transaction (or calling [`Transaction::rollback`]) discards
//! everything, including the buffered events.

use crate::activity::ActivityEvent;
use crate::database::Database;
use crate::entity::Entity;
use crate::tables::Tables;
use chrono::{DateTime, Utc};
use rw_core::{
    Apply, ApplyId, ChangeAction, ChangeEvent, ConfigurationVersion, CoreError, EntityTable, Job,
    JobType, Plan, PlanId, Result, Run, RunId, StateVersion, StateVersionId, StateVersionOutput,
    Workspace, WorkspaceAssessment, WorkspaceId,
};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// An open transaction. Reads see committed state plus this
/// transaction's own staged writes.
pub struct Transaction<'db> {
    db: &'db Database,
    staged: Tables,
    deleted: HashSet<(EntityTable, String)>,
    /// Committed version of each touched row when first staged
    /// (`None` = the row did not exist). Re-checked at commit.
    base_versions: HashMap<(EntityTable, String), Option<u64>>,
    events: Vec<ChangeEvent>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            staged: Tables::default(),
            deleted: HashSet::new(),
            base_versions: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Wall-clock time used for row stamps inside this transaction.
    pub fn now(&self) -> DateTime<Utc> {
        self.db.now()
    }

    /// Append a best-effort activity record, committed with the
    /// transaction.
    pub fn record_activity(&mut self, event: ActivityEvent) {
        self.staged.activity.push(event);
    }

    /// Commit every staged write and publish the buffered change events.
    pub fn commit(self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(CoreError::internal("transaction canceled before commit"));
        }
        self.db.apply(self.staged, self.deleted, self.base_versions, self.events)
    }

    /// Discard every staged write and buffered event.
    ///
    /// Dropping the transaction has the same effect; this form exists
    /// for call sites that want the discard to be explicit.
    pub fn rollback(self) {
        tracing::debug!(staged_events = self.events.len(), "transaction rolled back");
    }

    fn is_deleted(&self, table: EntityTable, id: &str) -> bool {
        self.deleted.contains(&(table, id.to_string()))
    }

    fn note_base_version(&mut self, table: EntityTable, id: &str, committed: Option<u64>) {
        self.base_versions.entry((table, id.to_string())).or_insert(committed);
    }

    fn push_event<E: Entity>(
        &mut self,
        action: ChangeAction,
        id: &str,
        entity: &E,
    ) -> Result<()> {
        self.events.push(ChangeEvent {
            table: E::TABLE,
            action,
            id: id.to_string(),
            data: serde_json::to_value(entity)?,
        });
        Ok(())
    }

    fn merged<E: Entity>(
        committed: &HashMap<String, E>,
        staged: &HashMap<String, E>,
        deleted: &HashSet<(EntityTable, String)>,
    ) -> Vec<E> {
        let mut rows: HashMap<&str, &E> =
            committed.iter().map(|(k, v)| (k.as_str(), v)).collect();
        for (k, v) in staged {
            rows.insert(k.as_str(), v);
        }
        rows.into_iter()
            .filter(|(k, _)| !deleted.contains(&(E::TABLE, (*k).to_string())))
            .map(|(_, v)| v.clone())
            .collect()
    }
}

macro_rules! entity_ops {
    ($entity:ty, $table:ident, $get:ident, $insert:ident, $update:ident, $delete:ident) => {
        impl Transaction<'_> {
            pub fn $get(&self, id: &str) -> Result<$entity> {
                let table = <$entity as Entity>::TABLE;
                if self.is_deleted(table, id) {
                    return Err(CoreError::not_found(format!("{} {} not found", table, id)));
                }
                if let Some(found) = self.staged.$table.get(id) {
                    return Ok(found.clone());
                }
                self.db
                    .tables()
                    .$table
                    .get(id)
                    .cloned()
                    .ok_or_else(|| CoreError::not_found(format!("{} {} not found", table, id)))
            }

            /// Stage an insert. The entity's row metadata is generated
            /// here; the returned copy carries it.
            pub fn $insert(&mut self, mut entity: $entity) -> Result<$entity> {
                let table = <$entity as Entity>::TABLE;
                let id = entity.id_string();
                let committed = self.db.tables().version_of(table, &id);
                if committed.is_some() || self.staged.$table.contains_key(&id) {
                    return Err(CoreError::conflict(format!(
                        "{} {} already exists",
                        table, id
                    )));
                }
                *entity.metadata_mut() = rw_core::RowMetadata::new(self.now());
                self.note_base_version(table, &id, None);
                self.push_event(ChangeAction::Insert, &id, &entity)?;
                self.staged.$table.insert(id, entity.clone());
                Ok(entity)
            }

            /// Stage an update. Fails with an optimistic-lock error when
            /// the passed entity's version is stale.
            pub fn $update(&mut self, mut entity: $entity) -> Result<$entity> {
                let table = <$entity as Entity>::TABLE;
                let id = entity.id_string();
                if self.is_deleted(table, &id) {
                    return Err(CoreError::not_found(format!("{} {} not found", table, id)));
                }
                let committed = self.db.tables().version_of(table, &id);
                let current = self
                    .staged
                    .$table
                    .get(&id)
                    .map(|e| e.metadata().version)
                    .or(committed);
                match current {
                    None => {
                        return Err(CoreError::not_found(format!(
                            "{} {} not found",
                            table, id
                        )))
                    }
                    Some(stored) if stored != entity.metadata().version => {
                        return Err(CoreError::optimistic_lock(format!(
                            "{} {} was modified concurrently (have version {}, stored {})",
                            table,
                            id,
                            entity.metadata().version,
                            stored
                        )))
                    }
                    Some(_) => {}
                }
                self.note_base_version(table, &id, committed);
                let touched = entity.metadata().touched(self.now());
                *entity.metadata_mut() = touched;
                self.push_event(ChangeAction::Update, &id, &entity)?;
                self.staged.$table.insert(id, entity.clone());
                Ok(entity)
            }

            /// Stage deletion of a row.
            pub fn $delete(&mut self, id: &str) -> Result<()> {
                let table = <$entity as Entity>::TABLE;
                let current = self.$get(id)?;
                let committed = self.db.tables().version_of(table, id);
                self.note_base_version(table, id, committed);
                self.push_event(ChangeAction::Delete, id, &current)?;
                self.staged.$table.remove(id);
                self.deleted.insert((table, id.to_string()));
                Ok(())
            }
        }
    };
}

entity_ops!(Run, runs, get_run, insert_run, update_run, delete_run);
entity_ops!(Plan, plans, get_plan, insert_plan, update_plan, delete_plan);
entity_ops!(Apply, applies, get_apply, insert_apply, update_apply, delete_apply);
entity_ops!(Job, jobs, get_job, insert_job, update_job, delete_job);
entity_ops!(
    Workspace,
    workspaces,
    get_workspace,
    insert_workspace,
    update_workspace,
    delete_workspace
);
entity_ops!(
    StateVersion,
    state_versions,
    get_state_version,
    insert_state_version,
    update_state_version,
    delete_state_version
);
entity_ops!(
    StateVersionOutput,
    state_version_outputs,
    get_state_version_output,
    insert_state_version_output,
    update_state_version_output,
    delete_state_version_output
);
entity_ops!(
    ConfigurationVersion,
    configuration_versions,
    get_configuration_version,
    insert_configuration_version,
    update_configuration_version,
    delete_configuration_version
);
entity_ops!(
    WorkspaceAssessment,
    assessments,
    get_assessment,
    insert_assessment,
    update_assessment,
    delete_assessment
);

impl Transaction<'_> {
    /// The run owning a plan. Every plan has exactly one.
    pub fn run_for_plan(&self, plan_id: &PlanId) -> Result<Run> {
        let guard = self.db.tables();
        Self::merged(&guard.runs, &self.staged.runs, &self.deleted)
            .into_iter()
            .find(|r| &r.plan_id == plan_id)
            .ok_or_else(|| {
                CoreError::not_found(format!("run owning plan {} not found", plan_id))
            })
    }

    /// The run owning an apply. Every apply has exactly one.
    pub fn run_for_apply(&self, apply_id: &ApplyId) -> Result<Run> {
        let guard = self.db.tables();
        Self::merged(&guard.runs, &self.staged.runs, &self.deleted)
            .into_iter()
            .find(|r| r.apply_id.as_ref() == Some(apply_id))
            .ok_or_else(|| {
                CoreError::not_found(format!("run owning apply {} not found", apply_id))
            })
    }

    /// Most recently queued job of the given type for a run.
    pub fn latest_job_for_run(&self, run_id: &RunId, kind: JobType) -> Option<Job> {
        let guard = self.db.tables();
        Self::merged(&guard.jobs, &self.staged.jobs, &self.deleted)
            .into_iter()
            .filter(|j| &j.run_id == run_id && j.kind == kind)
            .max_by_key(|j| j.timestamps.queued_at)
    }

    /// Assessment row for a workspace, if one exists.
    pub fn assessment_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Option<WorkspaceAssessment> {
        let guard = self.db.tables();
        Self::merged(&guard.assessments, &self.staged.assessments, &self.deleted)
            .into_iter()
            .find(|a| &a.workspace_id == workspace_id)
    }

    /// Outputs staged or committed for a state version, sorted by name.
    pub fn outputs_for_state_version(
        &self,
        state_version_id: &StateVersionId,
    ) -> Vec<StateVersionOutput> {
        let guard = self.db.tables();
        let mut outputs: Vec<StateVersionOutput> = Self::merged(
            &guard.state_version_outputs,
            &self.staged.state_version_outputs,
            &self.deleted,
        )
        .into_iter()
        .filter(|o| &o.state_version_id == state_version_id)
        .collect();
        outputs.sort_by(|a, b| a.name.cmp(&b.name));
        outputs
    }
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
