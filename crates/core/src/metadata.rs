// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row-level metadata shared by every persisted entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version and timestamp metadata carried by every row.
///
/// `version` drives optimistic locking: the store rejects a write whose
/// version does not match the stored row, and bumps it on every commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMetadata {
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RowMetadata {
    /// Metadata for a freshly inserted row.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { version: 1, created_at: now, updated_at: now }
    }

    /// Metadata after a committed update: version bumped, `updated_at` stamped.
    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        Self { version: self.version + 1, created_at: self.created_at, updated_at: now }
    }
}

impl Default for RowMetadata {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
