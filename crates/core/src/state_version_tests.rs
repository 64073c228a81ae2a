// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn state_version_id_prefixes() {
    assert!(StateVersionId::new().as_str().starts_with("sv-"));
    assert!(StateVersionOutputId::new().as_str().starts_with("svo-"));
}

#[test]
fn state_version_round_trips_through_json() {
    let sv = StateVersion::builder().run_id(RunId::from_string("run-1")).build();
    let json = serde_json::to_string(&sv).unwrap();
    let parsed: StateVersion = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, sv);
}

#[test]
fn output_preserves_value_and_type() {
    let output = StateVersionOutput {
        id: StateVersionOutputId::new(),
        metadata: RowMetadata::default(),
        state_version_id: StateVersionId::new(),
        name: "vpc_id".to_string(),
        value: serde_json::json!("vpc-0abc"),
        output_type: serde_json::json!("string"),
        sensitive: false,
    };
    let json = serde_json::to_string(&output).unwrap();
    let parsed: StateVersionOutput = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.value, serde_json::json!("vpc-0abc"));
    assert_eq!(parsed.output_type, serde_json::json!("string"));
}
