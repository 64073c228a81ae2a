// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn assessment_id_prefix() {
    assert!(WorkspaceAssessmentId::new().as_str().starts_with("asmt-"));
}

#[test]
fn builder_starts_without_drift() {
    let asmt = WorkspaceAssessment::builder().build();
    assert!(!asmt.has_drift);
    assert!(!asmt.requires_notification);
    assert!(asmt.completed_at.is_none());
    assert!(asmt.run_id.is_none());
}

#[test]
fn assessment_round_trips_through_json() {
    let asmt = WorkspaceAssessment::builder()
        .has_drift(true)
        .run_id(RunId::from_string("run-1"))
        .build();
    let json = serde_json::to_string(&asmt).unwrap();
    let parsed: WorkspaceAssessment = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, asmt);
}
