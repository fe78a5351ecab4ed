// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use yare::parameterized;

#[parameterized(
    validation = { ErrorKind::Validation, true },
    not_found = { ErrorKind::NotFound, true },
    permission = { ErrorKind::PermissionDenied, true },
    conflict = { ErrorKind::Conflict, true },
    rate_limited = { ErrorKind::RateLimited, true },
    cycle = { ErrorKind::DependencyCycle, true },
    timeout = { ErrorKind::Timeout, false },
    exhausted = { ErrorKind::ResourceExhausted, false },
    internal = { ErrorKind::Internal, false },
)]
fn caller_fault_classification(kind: ErrorKind, caller_fault: bool) {
    assert_eq!(kind.is_caller_fault(), caller_fault);
}

#[test]
fn display_includes_kind_and_message() {
    let err = Error::new(ErrorKind::NotFound, "job job-1 not found");
    assert_eq!(err.to_string(), "not_found: job job-1 not found");
}

#[test]
fn context_accumulates_entities_and_metadata() {
    let err = Error::new(ErrorKind::Conflict, "bad transition").with_context(
        ErrorContext::new("lifecycle", "transition")
            .entity("T0001")
            .entity("wf-1")
            .meta("from", serde_json::json!("pending")),
    );
    let ctx = err.context().unwrap();
    assert_eq!(ctx.component, "lifecycle");
    assert_eq!(ctx.entity_ids, vec!["T0001".to_string(), "wf-1".to_string()]);
    assert_eq!(ctx.metadata.get("from"), Some(&serde_json::json!("pending")));
}

#[test]
fn error_round_trips_through_json() {
    let err = Error::new(ErrorKind::RateLimited, "slow down")
        .with_context(ErrorContext::new("poll", "get_job_result").entity("job-9"));
    let json = serde_json::to_string(&err).unwrap();
    let parsed: Error = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.kind(), ErrorKind::RateLimited);
    assert_eq!(parsed.message(), "slow down");
    assert_eq!(parsed.context().unwrap().entity_ids, vec!["job-9".to_string()]);
}
