// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rw-artifacts: Workspace artifact and state-version coordination.
//!
//! Opaque artifacts (configuration archives, plan caches, plan JSON and
//! diffs, run variables, state blobs) live in the object store under a
//! deterministic key scheme; their database records live in the backing
//! store. This crate keeps the two consistent, most delicately in
//! [`ArtifactCoordinator::create_state_version`], where the blob upload
//! is ordered inside the database transaction so a failed upload never
//! leaves a visible row.

pub mod coordinator;
pub mod keys;
pub mod object_store;
pub mod state_file;

pub use coordinator::{ArtifactCoordinator, CreateStateVersionInput, PlanArtifactKind};
pub use object_store::{FsObjectStore, ObjectStore};
pub use state_file::{StateFile, StateResourceSummary, WorkspaceDependency};

#[cfg(any(test, feature = "test-support"))]
pub use object_store::MemoryObjectStore;
