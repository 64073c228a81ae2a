// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription filters and event matching.

use rw_core::{ChangeAction, ChangeEvent, EntityTable};

/// A filter over the change stream.
///
/// An event matches when the table equals `table`, the ID filter is
/// absent or equal to the event's ID, and the action list is empty or
/// contains the event's action. A subscription with an ID filter and no
/// action filter therefore matches every action for that row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub table: EntityTable,
    pub id: Option<String>,
    pub actions: Vec<ChangeAction>,
}

impl Subscription {
    /// Subscribe to every action on every row of a table.
    pub fn table(table: EntityTable) -> Self {
        Self { table, id: None, actions: Vec::new() }
    }

    /// Restrict to a single row.
    pub fn for_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Restrict to the given actions. An empty list means all actions.
    pub fn actions(mut self, actions: impl IntoIterator<Item = ChangeAction>) -> Self {
        self.actions = actions.into_iter().collect();
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if self.table != event.table {
            return false;
        }
        if let Some(id) = &self.id {
            if id != &event.id {
                return false;
            }
        }
        self.actions.is_empty() || self.actions.contains(&event.action)
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
