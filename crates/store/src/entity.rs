// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform row access over the persisted entity types.

use rw_core::{
    Apply, ConfigurationVersion, EntityTable, Job, Plan, RowMetadata, Run, StateVersion,
    StateVersionOutput, Workspace, WorkspaceAssessment,
};

/// A persisted entity: knows its table, its ID, and carries row metadata.
pub(crate) trait Entity: Clone + serde::Serialize {
    const TABLE: EntityTable;

    fn id_string(&self) -> String;
    fn metadata(&self) -> &RowMetadata;
    fn metadata_mut(&mut self) -> &mut RowMetadata;
}

macro_rules! impl_entity {
    ($ty:ty, $table:expr) => {
        impl Entity for $ty {
            const TABLE: EntityTable = $table;

            fn id_string(&self) -> String {
                self.id.to_string()
            }

            fn metadata(&self) -> &RowMetadata {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut RowMetadata {
                &mut self.metadata
            }
        }
    };
}

impl_entity!(Run, EntityTable::Runs);
impl_entity!(Plan, EntityTable::Plans);
impl_entity!(Apply, EntityTable::Applies);
impl_entity!(Job, EntityTable::Jobs);
impl_entity!(Workspace, EntityTable::Workspaces);
impl_entity!(StateVersion, EntityTable::StateVersions);
impl_entity!(StateVersionOutput, EntityTable::StateVersionOutputs);
impl_entity!(ConfigurationVersion, EntityTable::ConfigurationVersions);
impl_entity!(WorkspaceAssessment, EntityTable::WorkspaceAssessments);
