// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Transport scenarios: push events, adaptive pull polling, rate limiting.

use maestro_core::job::JobPatch;
use maestro_core::{Event, JobStatus, SessionId, TransportHint};

use super::support::stack;

fn sess() -> SessionId {
    SessionId::new("sess-1")
}

#[tokio::test]
async fn push_transport_streams_progress_events() {
    let s = stack();
    let mut events = s.emitter.subscribe();

    let (job, interval) = s.jobs.start_job(sess(), TransportHint::Push, "orchestrate");
    assert_eq!(interval, 0);

    for progress in [25u8, 50, 75] {
        s.clock.advance_ms(200);
        s.jobs
            .update_job(&job.job_id, JobPatch { progress: Some(progress), ..Default::default() })
            .expect("update");
    }
    s.clock.advance_ms(200);
    s.jobs
        .update_job(
            &job.job_id,
            JobPatch {
                status: Some(JobStatus::Completed),
                result: Some(serde_json::json!({"ok": true})),
                ..Default::default()
            },
        )
        .expect("complete");

    let mut progress_events = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::JobProgress { job: record, .. } = event {
            progress_events.push(record);
        }
    }
    assert!(progress_events.len() >= 3, "want at least three progress frames");
    for pair in progress_events.windows(2) {
        assert!(pair[1].progress >= pair[0].progress, "progress must not decrease");
    }
    let last = progress_events.last().expect("final event");
    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!(last.progress, 100);

    // pull fallback stays functional and keeps interval zero
    let fallback = s.jobs.get_job_result(&sess(), &job.job_id).expect("fallback");
    assert_eq!(fallback.poll_interval_ms, 0);
}

#[tokio::test]
async fn pull_transport_adapts_the_interval() {
    let s = stack();
    let (job, first_interval) = s.jobs.start_job(sess(), TransportHint::Pull, "orchestrate");
    assert!(first_interval > 0);

    // mid-job polls stay within the documented bounds
    let mut progress = 10u8;
    for _ in 0..6 {
        s.clock.advance_ms(700);
        s.jobs
            .update_job(&job.job_id, JobPatch { progress: Some(progress), ..Default::default() })
            .expect("update");
        progress += 10;
        s.clock.advance_ms(700);
        let response = s.jobs.get_job_result(&sess(), &job.job_id).expect("poll");
        assert!(response.poll_interval_ms >= 200, "floor: {}", response.poll_interval_ms);
        assert!(response.poll_interval_ms <= 30_000, "ceiling: {}", response.poll_interval_ms);
    }

    s.jobs
        .update_job(
            &job.job_id,
            JobPatch {
                status: Some(JobStatus::Completed),
                result: Some(serde_json::json!({"ok": true})),
                ..Default::default()
            },
        )
        .expect("complete");
    s.clock.advance_ms(700);
    let terminal = s.jobs.get_job_result(&sess(), &job.job_id).expect("terminal poll");
    assert_eq!(terminal.poll_interval_ms, 0);
}

#[tokio::test]
async fn rapid_polls_hit_the_rate_limiter() {
    let s = stack();
    let (job, _) = s.jobs.start_job(sess(), TransportHint::Pull, "orchestrate");

    let mut waits = Vec::new();
    for _ in 0..10 {
        let response = s.jobs.get_job_result(&sess(), &job.job_id).expect("poll");
        if let Some(limit) = response.rate_limit {
            waits.push(limit.wait_time_ms);
        }
    }
    assert!(!waits.is_empty(), "at least one poll must be limited");
    for pair in waits.windows(2) {
        assert!(pair[1] >= pair[0], "wait times must not decrease: {waits:?}");
    }

    // honoring the advertised wait clears the penalty
    let last_wait = *waits.last().expect("wait");
    s.clock.advance_ms(last_wait);
    let response = s.jobs.get_job_result(&sess(), &job.job_id).expect("compliant poll");
    assert!(response.rate_limit.is_none());
}
