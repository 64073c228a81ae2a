// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration version entity.

use crate::metadata::RowMetadata;
use crate::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a configuration version.
    pub struct ConfigurationVersionId("cv-");
}

/// Upload status of a configuration version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigurationVersionStatus {
    Pending,
    Uploaded,
}

crate::simple_display! {
    ConfigurationVersionStatus {
        Pending => "pending",
        Uploaded => "uploaded",
    }
}

/// An uploaded Terraform source bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationVersion {
    pub id: ConfigurationVersionId,
    pub metadata: RowMetadata,
    pub workspace_id: WorkspaceId,
    pub status: ConfigurationVersionStatus,
    /// Runs created from a speculative configuration version must
    /// themselves be speculative.
    pub speculative: bool,
    pub created_by: String,
}

crate::builder! {
    pub struct ConfigurationVersionBuilder => ConfigurationVersion {
        into {
            id: ConfigurationVersionId = ConfigurationVersionId::new(),
            workspace_id: WorkspaceId = WorkspaceId::new(),
            created_by: String = "test-user",
        }
        set {
            metadata: RowMetadata = RowMetadata::default(),
            status: ConfigurationVersionStatus = ConfigurationVersionStatus::Pending,
            speculative: bool = false,
        }
    }
}

#[cfg(test)]
#[path = "configuration_version_tests.rs"]
mod tests;
