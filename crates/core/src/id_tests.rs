// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use yare::parameterized;

#[test]
fn job_id_generate_is_unique() {
    let a = JobId::generate();
    let b = JobId::generate();
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("job-"));
}

#[test]
fn workflow_id_generate_has_prefix() {
    assert!(WorkflowId::generate().as_str().starts_with("wf-"));
}

#[test]
fn id_serde_is_transparent() {
    let id = TaskId::new("T0001");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"T0001\"");
    let parsed: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[parameterized(
    first = { 1, "T0001" },
    padded = { 42, "T0042" },
    four_digits = { 9999, "T9999" },
    overflow_width = { 12345, "T12345" },
)]
fn task_id_format(counter: u64, expected: &str) {
    assert_eq!(TaskId::format(counter).as_str(), expected);
}

#[parameterized(
    task = { "T0001", true },
    task_long = { "T123456", true },
    task_short = { "T001", false },
    task_alpha = { "TASK1", false },
    empty = { "", false },
)]
fn task_id_shape(s: &str, valid: bool) {
    assert_eq!(TaskId::is_valid(s), valid);
}

#[test]
fn epic_id_format_and_shape() {
    let id = EpicId::format(7);
    assert_eq!(id.as_str(), "E007");
    assert!(EpicId::is_valid(id.as_str()));
    assert!(!EpicId::is_valid("E07"));
}

#[test]
fn project_id_format_and_shape() {
    let id = ProjectId::format("BILLING", 1);
    assert_eq!(id.as_str(), "PID-BILLING-001");
    assert!(ProjectId::is_valid(id.as_str()));
    assert!(!ProjectId::is_valid("PID-lower-001"));
    assert!(!ProjectId::is_valid("BILLING-001"));
}

#[test]
fn dependency_id_format_and_shape() {
    let id = DependencyId::format(&TaskId::new("T0001"), &TaskId::new("T0002"), 3);
    assert_eq!(id.as_str(), "DEP-T0001-T0002-003");
    assert!(DependencyId::is_valid(id.as_str()));
    assert!(!DependencyId::is_valid("DEP-T0001-003"));
}

#[parameterized(
    plain = { "billing", "BILLING" },
    spaces = { "my billing system", "MY-BILLING-SYSTEM" },
    collapse = { "a__b  c", "A-B-C" },
    truncates = { "averyverylongprojectnamehere", "AVERYVERYLONGPROJECT" },
    trailing_dash_trimmed = { "ops team x-", "OPS-TEAM-X" },
)]
fn sanitize_segment(input: &str, expected: &str) {
    assert_eq!(sanitize_name_segment(input), expected);
}

#[test]
fn validate_accepts_reasonable_name() {
    match validate_project_name("Billing Revamp") {
        NameValidation::Valid { segment } => assert_eq!(segment, "BILLING-REVAMP"),
        other => panic!("expected valid, got {other:?}"),
    }
}

#[parameterized(
    too_short = { "x" },
    too_long = { "this project name is way too long to be accepted by the validator ok" },
    bad_char = { "billing!" },
)]
fn validate_rejects(input: &str) {
    let v = validate_project_name(input);
    assert!(!v.is_valid());
    match v {
        NameValidation::Invalid { suggestion, .. } => {
            assert!(suggestion.len() >= PROJECT_NAME_MIN);
            assert!(suggestion.len() <= PROJECT_NAME_MAX);
        }
        NameValidation::Valid { .. } => panic!("expected invalid"),
    }
}

#[test]
fn suggestion_drops_stop_words() {
    let v = validate_project_name(
        "the monitoring and alerting system for the data platform of the future team",
    );
    match v {
        NameValidation::Invalid { suggestion, .. } => {
            assert!(!suggestion.to_ascii_lowercase().split_whitespace().any(|w| w == "the"));
            assert!(suggestion.len() <= PROJECT_NAME_MAX);
        }
        NameValidation::Valid { .. } => panic!("expected invalid"),
    }
}
