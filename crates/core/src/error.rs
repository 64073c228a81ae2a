// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical error taxonomy surfaced to callers.

use thiserror::Error;

/// Classification of an error as observed by callers.
///
/// `OptimisticLock` is recovered internally by the handler retry loop and
/// escapes only after exhaustion; every other kind propagates up, aborting
/// the enclosing transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input or an illegal state transition
    Invalid,
    /// Entity missing
    NotFound,
    /// Caller lacks permission
    Forbidden,
    /// Operation would violate an invariant (e.g. workspace lock held)
    Conflict,
    /// Concurrent writer modified a row between read and write
    OptimisticLock,
    /// Unexpected failure (object-store I/O, schema mismatch)
    Internal,
}

crate::simple_display! {
    ErrorKind {
        Invalid => "invalid",
        NotFound => "not found",
        Forbidden => "forbidden",
        Conflict => "conflict",
        OptimisticLock => "optimistic lock",
        Internal => "internal",
    }
}

/// Error type returned by every public operation of the core.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct CoreError {
    kind: ErrorKind,
    message: String,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn optimistic_lock(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OptimisticLock, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_optimistic_lock(&self) -> bool {
        self.kind == ErrorKind::OptimisticLock
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("serialization failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
