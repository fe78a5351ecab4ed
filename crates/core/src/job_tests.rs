// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use yare::parameterized;

fn record() -> JobRecord {
    JobRecord::new(
        JobId::new("job-1"),
        SessionId::new("sess-1"),
        "decompose",
        TransportHint::Pull,
        1_000,
    )
}

#[test]
fn new_job_is_pending_with_zero_progress() {
    let job = record();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.progress, 0);
    assert_eq!(job.created_at, job.updated_at);
    assert!(job.result.is_none());
}

#[test]
fn status_serializes_screaming() {
    let json = serde_json::to_string(&JobStatus::Running).unwrap();
    assert_eq!(json, "\"RUNNING\"");
}

#[test]
fn apply_advances_progress_and_updated_at() {
    let mut job = record();
    let patch = JobPatch {
        status: Some(JobStatus::Running),
        progress: Some(40),
        message: Some("working".into()),
        result: None,
    };
    job.apply(patch, 2_000).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.progress, 40);
    assert_eq!(job.message, "working");
    assert_eq!(job.updated_at, 2_000);
}

#[test]
fn apply_rejects_progress_decrease() {
    let mut job = record();
    job.apply(JobPatch { progress: Some(50), ..Default::default() }, 2_000).unwrap();
    let err = job
        .apply(JobPatch { progress: Some(30), ..Default::default() }, 3_000)
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Conflict);
    assert_eq!(job.progress, 50);
}

#[test]
fn apply_rejects_progress_over_100() {
    let mut job = record();
    let err = job
        .apply(JobPatch { progress: Some(101), ..Default::default() }, 2_000)
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
}

#[parameterized(
    completed = { JobStatus::Completed },
    failed = { JobStatus::Failed },
    cancelled = { JobStatus::Cancelled },
)]
fn terminal_status_is_stable(terminal: JobStatus) {
    let mut job = record();
    let result =
        (terminal == JobStatus::Completed).then(|| serde_json::json!({"ok": true}));
    job.apply(JobPatch { status: Some(terminal), result, ..Default::default() }, 2_000).unwrap();
    let err = job
        .apply(JobPatch { status: Some(JobStatus::Running), ..Default::default() }, 3_000)
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Conflict);
    assert_eq!(job.status, terminal);
}

#[test]
fn terminal_patch_with_same_status_is_idempotent() {
    let mut job = record();
    job.apply(JobPatch { status: Some(JobStatus::Failed), ..Default::default() }, 2_000).unwrap();
    job.apply(JobPatch { status: Some(JobStatus::Failed), ..Default::default() }, 3_000).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

#[test]
fn completion_forces_progress_to_100() {
    let mut job = record();
    job.apply(
        JobPatch {
            status: Some(JobStatus::Completed),
            result: Some(serde_json::json!({"ok": true})),
            ..Default::default()
        },
        2_000,
    )
    .unwrap();
    assert_eq!(job.progress, 100);
    assert!(job.result.is_some());
}

#[test]
fn completion_without_result_is_rejected() {
    let mut job = record();
    let err = job
        .apply(JobPatch { status: Some(JobStatus::Completed), ..Default::default() }, 2_000)
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
    assert_eq!(job.status, JobStatus::Pending);
}

#[test]
fn result_rejected_before_completion() {
    let mut job = record();
    let err = job
        .apply(
            JobPatch { result: Some(serde_json::json!("partial")), ..Default::default() },
            2_000,
        )
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
}

#[test]
fn updated_at_never_runs_backwards() {
    let mut job = record();
    job.apply(JobPatch { progress: Some(10), ..Default::default() }, 5_000).unwrap();
    job.apply(JobPatch { progress: Some(20), ..Default::default() }, 4_000).unwrap();
    assert_eq!(job.updated_at, 5_000);
}
