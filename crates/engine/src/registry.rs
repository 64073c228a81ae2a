// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed handler registries.
//!
//! One registry per entity kind, each parameterised on the entity's
//! old/new pair, so dispatch mistakes are construction-time errors rather
//! than runtime casts. Handlers run in registration order; a handler
//! failure aborts the originating update because everything shares one
//! transaction.

use crate::manager::RunStateManager;
use async_trait::async_trait;
use rw_core::Result;
use rw_store::Transaction;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Old and new images of an entity across one update.
#[derive(Debug, Clone)]
pub struct Change<E> {
    pub old: E,
    pub new: E,
}

/// A cascade reacting to one entity kind's updates.
///
/// Handlers may read and write through the transaction and recursively
/// drive further updates via the manager, but must not produce side
/// effects outside the transaction: no object-store writes, no direct
/// event emission. The change feed fires on commit only.
#[async_trait]
pub trait ChangeHandler<E>: Send + Sync {
    /// Handler name for logs.
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        change: &Change<E>,
    ) -> Result<()>;
}

/// Fixed-delay retry for optimistic-lock conflicts inside handlers.
/// Any other error fails fast. The defaults are the production values.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 100, delay: Duration::from_millis(10) }
    }
}

/// Ordered handler list for one entity kind.
pub struct Registry<E> {
    handlers: Vec<Box<dyn ChangeHandler<E>>>,
    retry: RetryPolicy,
}

impl<E: Send + Sync> Registry<E> {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { handlers: Vec::new(), retry }
    }

    pub fn register(&mut self, handler: impl ChangeHandler<E> + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke every handler in registration order, retrying each on
    /// optimistic-lock conflicts. Cancellation aborts the retry loop
    /// with the last error.
    pub(crate) async fn fire(
        &self,
        mgr: &RunStateManager,
        tx: &mut Transaction<'_>,
        cancel: &CancellationToken,
        change: &Change<E>,
    ) -> Result<()> {
        for handler in &self.handlers {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                match handler.handle(mgr, tx, cancel, change).await {
                    Ok(()) => break,
                    Err(err) if err.is_optimistic_lock() && attempt < self.retry.max_attempts => {
                        tracing::debug!(
                            handler = handler.name(),
                            attempt,
                            "optimistic lock conflict; retrying"
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(err),
                            _ = tokio::time::sleep(self.retry.delay) => {}
                        }
                    }
                    Err(err) => {
                        tracing::debug!(handler = handler.name(), error = %err, "handler failed");
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
