// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-global, write-only metric counters and histograms.
//!
//! Business logic only ever writes these; exporting is an adjacent
//! concern. No init or teardown required.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic event counter.
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value, for exporters and tests.
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Count + sum histogram over millisecond observations.
pub struct Histogram {
    count: AtomicU64,
    sum_ms: AtomicU64,
}

impl Histogram {
    pub const fn new() -> Self {
        Self { count: AtomicU64::new(0), sum_ms: AtomicU64::new(0) }
    }

    pub fn observe_ms(&self, ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum_ms(&self) -> u64 {
        self.sum_ms.load(Ordering::Relaxed)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Plans that reached a terminal status.
pub static PLAN_COMPLETED: Counter = Counter::new();

/// Applies that reached a terminal status.
pub static APPLY_COMPLETED: Counter = Counter::new();

/// Workspaces where an assessment newly detected drift.
pub static WORKSPACE_DRIFT_COUNT: Counter = Counter::new();

/// Wall-clock execution time of plan jobs.
pub static PLAN_EXECUTION_TIME: Histogram = Histogram::new();

/// Wall-clock execution time of apply jobs.
pub static APPLY_EXECUTION_TIME: Histogram = Histogram::new();

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
