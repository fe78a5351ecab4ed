// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use maestro_core::{ErrorKind, SessionId, TransportHint};

#[test]
fn job_started_omits_empty_optionals() {
    let response = Response::JobStarted {
        job_id: JobId::new("job-1"),
        message: "accepted".to_string(),
        poll_interval_ms: 0,
        workflow_id: None,
        report: None,
    };
    let json = serde_json::to_string(&response).unwrap();
    assert!(!json.contains("workflow_id"));
    assert!(!json.contains("report"));
}

#[test]
fn job_result_carries_rate_limit() {
    let job = JobRecord::new(
        JobId::new("job-1"),
        SessionId::new("sess-1"),
        "decompose",
        TransportHint::Pull,
        1_000,
    );
    let response = Response::JobResult {
        job,
        poll_interval_ms: 1_000,
        rate_limit: Some(RateLimit { wait_time_ms: 2_000, next_allowed_at: 5_000 }),
    };
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["rate_limit"]["wait_time_ms"], 2_000);
    let parsed: Response = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, response);
}

#[test]
fn error_response_preserves_kind() {
    let response = Response::error(Error::new(ErrorKind::RateLimited, "slow down"));
    let json = serde_json::to_string(&response).unwrap();
    let parsed: Response = serde_json::from_str(&json).unwrap();
    match parsed {
        Response::Error { error } => assert_eq!(error.kind(), ErrorKind::RateLimited),
        other => panic!("expected error response, got {other:?}"),
    }
}
