// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination between artifact blobs and their database records.

use crate::keys;
use crate::object_store::ObjectStore;
use crate::state_file::{self, StateResourceSummary, WorkspaceDependency};
use rw_core::{
    Caller, ConfigurationVersion, ConfigurationVersionId, ConfigurationVersionStatus, CoreError,
    EntityTable, PlanId, Result, RowMetadata, RunId, StateVersion, StateVersionId,
    StateVersionOutput, StateVersionOutputId, WorkspaceId,
};
use rw_store::{ActivityEvent, Database};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::sync::CancellationToken;

/// Input for [`ArtifactCoordinator::create_state_version`].
#[derive(Debug, Clone)]
pub struct CreateStateVersionInput {
    pub workspace_id: WorkspaceId,
    /// The run whose apply produced this snapshot, if any.
    pub run_id: Option<RunId>,
    /// Base64-encoded Terraform state payload.
    pub state: String,
}

/// The three plan-phase artifacts a worker produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanArtifactKind {
    /// Opaque binary plan cache consumed by the apply phase.
    Cache,
    /// Plan rendered as JSON.
    Json,
    /// Structured diff of the plan.
    Diff,
}

impl PlanArtifactKind {
    fn key(self, workspace_id: &WorkspaceId, run_id: &RunId, plan_id: &PlanId) -> String {
        match self {
            PlanArtifactKind::Cache => keys::plan_cache(workspace_id, run_id, plan_id),
            PlanArtifactKind::Json => keys::plan_json(workspace_id, run_id, plan_id),
            PlanArtifactKind::Diff => keys::plan_diff(workspace_id, run_id, plan_id),
        }
    }
}

/// Upload/download of opaque artifacts plus the state-version protocol.
pub struct ArtifactCoordinator {
    db: Arc<Database>,
    objects: Arc<dyn ObjectStore>,
}

impl ArtifactCoordinator {
    pub fn new(db: Arc<Database>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { db, objects }
    }

    /// Record a new state version for a workspace.
    ///
    /// The blob upload happens inside the database transaction's
    /// lifetime but outside its atomicity (the object store has no
    /// transactions): an upload failure rolls everything back so the
    /// row is never observable, while a commit failure after a
    /// successful upload merely orphans a blob the next attempt
    /// overwrites (keys are deterministic).
    pub async fn create_state_version(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        input: CreateStateVersionInput,
    ) -> Result<StateVersion> {
        let workspace = self.db.get_workspace(input.workspace_id.as_str())?;
        caller.require_permission("state_version:create", &workspace.full_path)?;

        let data = state_file::decode_base64(&input.state)?;

        let mut tx = self.db.begin(cancel)?;
        let state_version = tx.insert_state_version(StateVersion {
            id: StateVersionId::new(),
            metadata: RowMetadata::default(),
            workspace_id: input.workspace_id,
            run_id: input.run_id,
            created_by: caller.subject().to_string(),
        })?;

        let mut workspace = tx.get_workspace(input.workspace_id.as_str())?;
        workspace.dirty_state = false;
        workspace.current_state_version_id = Some(state_version.id);
        tx.update_workspace(workspace)?;

        let parsed = state_file::parse(&data)?;
        for (name, output) in &parsed.outputs {
            tx.insert_state_version_output(StateVersionOutput {
                id: StateVersionOutputId::new(),
                metadata: RowMetadata::default(),
                state_version_id: state_version.id,
                name: name.clone(),
                value: output.value.clone(),
                output_type: output.output_type.clone(),
                sensitive: output.sensitive,
            })?;
        }

        let now = tx.now();
        tx.record_activity(ActivityEvent {
            action: "state_version.create".to_string(),
            target_table: EntityTable::StateVersions,
            target_id: state_version.id.to_string(),
            subject: caller.subject().to_string(),
            occurred_at: now,
        });

        let key = keys::state_version(&input.workspace_id, &state_version.id);
        self.objects.upload_object(cancel, &key, data).await?;

        tx.commit(cancel)?;
        tracing::info!(
            state_version = %state_version.id,
            workspace = %input.workspace_id,
            outputs = parsed.outputs.len(),
            "state version created"
        );
        Ok(state_version)
    }

    /// Enumerate the resources recorded in a state version's blob.
    pub async fn state_version_resources(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        id: &StateVersionId,
    ) -> Result<Vec<StateResourceSummary>> {
        let state = self.read_state_file(cancel, caller, id).await?;
        Ok(state.resource_summaries())
    }

    /// Enumerate cross-workspace dependencies recorded in a state
    /// version's blob.
    pub async fn state_version_dependencies(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        id: &StateVersionId,
    ) -> Result<Vec<WorkspaceDependency>> {
        let state = self.read_state_file(cancel, caller, id).await?;
        state.workspace_dependencies()
    }

    /// Stream a state version's blob into `writer`.
    pub async fn download_state_version(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        id: &StateVersionId,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        let (workspace_id, workspace_path) = self.state_version_scope(id)?;
        caller.require_permission("state_version:read", &workspace_path)?;
        let key = keys::state_version(&workspace_id, id);
        self.objects.download_object(cancel, &key, writer).await
    }

    /// Presigned URL for a state version's blob.
    pub async fn state_version_download_url(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        id: &StateVersionId,
    ) -> Result<String> {
        let (workspace_id, workspace_path) = self.state_version_scope(id)?;
        caller.require_permission("state_version:read", &workspace_path)?;
        let key = keys::state_version(&workspace_id, id);
        self.objects.presigned_url(cancel, &key).await
    }

    /// Store a configuration archive and flip its record to uploaded.
    pub async fn upload_configuration(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        id: &ConfigurationVersionId,
        archive: Vec<u8>,
    ) -> Result<ConfigurationVersion> {
        let mut tx = self.db.begin(cancel)?;
        let cv = tx.get_configuration_version(id.as_str())?;
        let workspace = tx.get_workspace(cv.workspace_id.as_str())?;
        caller.require_permission("configuration_version:upload", &workspace.full_path)?;

        if cv.status == ConfigurationVersionStatus::Uploaded {
            return Err(CoreError::invalid(format!(
                "configuration version {} has already been uploaded",
                cv.id
            )));
        }
        let mut cv = cv;
        cv.status = ConfigurationVersionStatus::Uploaded;
        let cv = tx.update_configuration_version(cv)?;

        let key = keys::configuration_version(&cv.workspace_id, &cv.id);
        self.objects.upload_object(cancel, &key, archive).await?;
        tx.commit(cancel)?;
        Ok(cv)
    }

    /// Stream a configuration archive.
    pub async fn configuration_stream(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        id: &ConfigurationVersionId,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let cv = self.db.get_configuration_version(id.as_str())?;
        let workspace = self.db.get_workspace(cv.workspace_id.as_str())?;
        caller.require_permission("configuration_version:read", &workspace.full_path)?;
        if cv.status != ConfigurationVersionStatus::Uploaded {
            return Err(CoreError::invalid(format!(
                "configuration version {} has not been uploaded",
                cv.id
            )));
        }
        let key = keys::configuration_version(&cv.workspace_id, &cv.id);
        self.objects.get_object_stream(cancel, &key).await
    }

    /// Store one of a plan's artifacts.
    pub async fn save_plan_artifact(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        plan_id: &PlanId,
        kind: PlanArtifactKind,
        data: Vec<u8>,
    ) -> Result<()> {
        let (key, workspace_path) = self.plan_artifact_scope(plan_id, kind)?;
        caller.require_permission("plan_artifact:write", &workspace_path)?;
        self.objects.upload_object(cancel, &key, data).await
    }

    /// Stream one of a plan's artifacts.
    pub async fn plan_artifact_stream(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        plan_id: &PlanId,
        kind: PlanArtifactKind,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let (key, workspace_path) = self.plan_artifact_scope(plan_id, kind)?;
        caller.require_permission("plan_artifact:read", &workspace_path)?;
        self.objects.get_object_stream(cancel, &key).await
    }

    /// Persist the resolved variable set for a run.
    pub async fn save_run_variables(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        run_id: &RunId,
        variables: &serde_json::Value,
    ) -> Result<()> {
        let run = self.db.get_run(run_id.as_str())?;
        let workspace = self.db.get_workspace(run.workspace_id.as_str())?;
        caller.require_permission("run_variables:write", &workspace.full_path)?;
        let key = keys::run_variables(&run.workspace_id, &run.id);
        let body = serde_json::to_vec(variables)?;
        self.objects.upload_object(cancel, &key, body).await
    }

    /// Read back the resolved variable set for a run.
    pub async fn run_variables(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        run_id: &RunId,
    ) -> Result<serde_json::Value> {
        let run = self.db.get_run(run_id.as_str())?;
        let workspace = self.db.get_workspace(run.workspace_id.as_str())?;
        caller.require_permission("run_variables:read", &workspace.full_path)?;
        let key = keys::run_variables(&run.workspace_id, &run.id);
        let mut reader = self.objects.get_object_stream(cancel, &key).await?;
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .await
            .map_err(|e| CoreError::internal(format!("reading {}: {}", key, e)))?;
        serde_json::from_slice(&body)
            .map_err(|e| CoreError::internal(format!("malformed run variables: {}", e)))
    }

    async fn read_state_file(
        &self,
        cancel: &CancellationToken,
        caller: &dyn Caller,
        id: &StateVersionId,
    ) -> Result<state_file::StateFile> {
        let (workspace_id, workspace_path) = self.state_version_scope(id)?;
        caller.require_permission("state_version:read", &workspace_path)?;
        let key = keys::state_version(&workspace_id, id);
        let mut reader = self.objects.get_object_stream(cancel, &key).await?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| CoreError::internal(format!("reading {}: {}", key, e)))?;
        state_file::parse(&data)
    }

    fn state_version_scope(&self, id: &StateVersionId) -> Result<(WorkspaceId, String)> {
        let state_version = self.db.get_state_version(id.as_str())?;
        let workspace = self.db.get_workspace(state_version.workspace_id.as_str())?;
        Ok((workspace.id, workspace.full_path))
    }

    fn plan_artifact_scope(
        &self,
        plan_id: &PlanId,
        kind: PlanArtifactKind,
    ) -> Result<(String, String)> {
        let run = self.db.run_for_plan(plan_id.as_str())?;
        let workspace = self.db.get_workspace(run.workspace_id.as_str())?;
        Ok((kind.key(&workspace.id, &run.id, plan_id), workspace.full_path))
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
