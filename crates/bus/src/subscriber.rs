// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber handles and event consumption.

use crate::subscription::Subscription;
use rw_core::{ChangeEvent, CoreError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why `next_event` resolved without an event.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("subscription canceled")]
    Canceled,
    #[error("subscriber has been unsubscribed")]
    Unsubscribed,
    #[error("event stream error: {0}")]
    Stream(CoreError),
}

/// Dispatch-side handle for one subscriber.
pub(crate) struct SubscriberHandle {
    pub id: Uuid,
    pub subscriptions: Vec<Subscription>,
    pub events: mpsc::Sender<ChangeEvent>,
    pub errors: mpsc::Sender<CoreError>,
    /// Unsubscribe signal. Cancellation is idempotent, so repeated
    /// unsubscribes are no-ops.
    pub done: CancellationToken,
}

impl SubscriberHandle {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.subscriptions.iter().any(|s| s.matches(event))
    }
}

/// Consumer side of a subscription.
///
/// Lifecycle is `active → unsubscribed`; once unsubscribed every
/// `next_event` call resolves with [`BusError::Unsubscribed`].
pub struct Subscriber {
    pub(crate) id: Uuid,
    pub(crate) events: mpsc::Receiver<ChangeEvent>,
    pub(crate) errors: mpsc::Receiver<CoreError>,
    pub(crate) done: CancellationToken,
}

impl Subscriber {
    /// Stable identity of this subscriber.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next matching event.
    ///
    /// Resolves with `Canceled` as soon as `cancel` fires, with
    /// `Unsubscribed` once the subscriber has been unsubscribed (by the
    /// caller or forcibly by the bus), and with `Stream` when the listen
    /// stream failed; each stream failure is surfaced once, after which
    /// events resume when the bus reconnects.
    pub async fn next_event(&mut self, cancel: &CancellationToken) -> Result<ChangeEvent, BusError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BusError::Canceled),
            _ = self.done.cancelled() => Err(BusError::Unsubscribed),
            err = self.errors.recv() => match err {
                Some(err) => Err(BusError::Stream(err)),
                None => Err(BusError::Unsubscribed),
            },
            event = self.events.recv() => match event {
                Some(event) => Ok(event),
                None => Err(BusError::Unsubscribed),
            },
        }
    }
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod tests;
