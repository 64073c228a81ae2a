// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rw-bus: In-process event bus over the store's change feed.
//!
//! One background task forwards row-level change events from the store's
//! listen stream to subscribers whose subscriptions match. Delivery is
//! at-most-once with bounded per-subscriber buffers; consumers re-read
//! the affected entity after each delivered event rather than trusting
//! the payload. Nothing coalesces event bursts; a handler chain that
//! touches the same row several times in one transaction surfaces as
//! several events.

mod bus;
mod subscriber;
mod subscription;

pub use bus::{BusConfig, EventBus};
pub use subscriber::{BusError, Subscriber};
pub use subscription::Subscription;
