// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort activity records appended inside transactions.

use chrono::{DateTime, Utc};
use rw_core::EntityTable;
use serde::{Deserialize, Serialize};

/// One audit-trail entry. Committed atomically with the transaction that
/// recorded it; never read back by business logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Verb, e.g. `run.create` or `state_version.create`.
    pub action: String,
    pub target_table: EntityTable,
    pub target_id: String,
    /// Caller subject that performed the action.
    pub subject: String,
    pub occurred_at: DateTime<Utc>,
}
