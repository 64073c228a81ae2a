// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: subscription registry, dispatch, and the reconnect loop.

use crate::subscriber::{Subscriber, SubscriberHandle};
use crate::subscription::Subscription;
use parking_lot::RwLock;
use rw_core::{ChangeEvent, CoreError};
use rw_store::Database;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-subscriber error channel depth. Errors beyond this are dropped
/// rather than blocking the dispatcher.
const ERROR_BUFFER_CAPACITY: usize = 16;

/// Tuning knobs for the bus. The defaults are the production values.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Bounded event buffer per subscriber.
    pub buffer_capacity: usize,
    /// How long a send may block on a full buffer before the subscriber
    /// is considered permanently stuck and forcibly unsubscribed.
    pub send_timeout: Duration,
    /// Sleep between a listen-stream failure and reopening it.
    pub reconnect_delay: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 500,
            send_timeout: Duration::from_secs(5 * 60),
            reconnect_delay: Duration::from_secs(10),
        }
    }
}

/// In-process fan-out of the store's change feed.
///
/// Cheap to clone; all clones share the subscriber registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    db: Arc<Database>,
    config: BusConfig,
    subscribers: RwLock<Vec<Arc<SubscriberHandle>>>,
}

impl EventBus {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_config(db, BusConfig::default())
    }

    pub fn with_config(db: Arc<Database>, config: BusConfig) -> Self {
        Self { inner: Arc::new(BusInner { db, config, subscribers: RwLock::new(Vec::new()) }) }
    }

    /// Spawn the background task that pumps the listen stream until
    /// `cancel` fires.
    pub fn start(&self, cancel: CancellationToken) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(cancel).await });
    }

    /// Register a subscriber over the given subscriptions.
    ///
    /// A subscriber receives every event matched by ANY of its
    /// subscriptions, in listen-stream order. No ordering is promised
    /// across subscribers.
    pub fn subscribe(&self, subscriptions: Vec<Subscription>) -> Subscriber {
        let (events_tx, events_rx) = mpsc::channel(self.inner.config.buffer_capacity);
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_BUFFER_CAPACITY);
        let id = Uuid::new_v4();
        let done = CancellationToken::new();

        let handle = Arc::new(SubscriberHandle {
            id,
            subscriptions,
            events: events_tx,
            errors: errors_tx,
            done: done.clone(),
        });
        self.inner.subscribers.write().push(handle);
        tracing::debug!(subscriber = %id, "subscribed");

        Subscriber { id, events: events_rx, errors: errors_rx, done }
    }

    /// Remove a subscriber. Idempotent; unsubscribing twice is a no-op.
    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        subscriber.done.cancel();
        self.inner.remove(subscriber.id);
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl BusInner {
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let mut stream = self.db.listen();
            tracing::debug!("listen stream opened");

            let failure = loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    err = stream.errors.recv() => {
                        break err.unwrap_or_else(|| {
                            CoreError::internal("listen error channel closed")
                        });
                    }
                    event = stream.events.recv() => match event {
                        Some(event) => self.dispatch(event, &cancel).await,
                        None => break CoreError::internal("listen stream closed"),
                    }
                }
            };

            tracing::warn!(error = %failure, "listen stream failed; reconnecting");
            self.broadcast_error(failure);

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    /// Deliver one event to every matching subscriber.
    ///
    /// The match set is snapshotted under the read lock and the sends
    /// performed after releasing it, so a subscriber joining or leaving
    /// mid-dispatch does not change this dispatch.
    async fn dispatch(&self, event: ChangeEvent, cancel: &CancellationToken) {
        let matched: Vec<Arc<SubscriberHandle>> = {
            let subscribers = self.subscribers.read();
            subscribers.iter().filter(|s| s.matches(&event)).cloned().collect()
        };

        for handle in matched {
            if cancel.is_cancelled() {
                return;
            }
            match tokio::time::timeout(
                self.config.send_timeout,
                handle.events.send(event.clone()),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    // Receiver dropped; prune the handle.
                    self.remove(handle.id);
                }
                Err(_) => {
                    tracing::warn!(
                        subscriber = %handle.id,
                        table = %event.table,
                        "subscriber buffer stuck; force unsubscribing"
                    );
                    handle.done.cancel();
                    self.remove(handle.id);
                }
            }
        }
    }

    /// Push a stream failure to every subscriber, dropping on full
    /// error channels rather than blocking.
    fn broadcast_error(&self, err: CoreError) {
        let subscribers = self.subscribers.read();
        for handle in subscribers.iter() {
            let _ = handle.errors.try_send(err.clone());
        }
    }

    fn remove(&self, id: Uuid) {
        self.subscribers.write().retain(|s| s.id != id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
