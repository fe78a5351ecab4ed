// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use maestro_core::job::JobPatch;
use maestro_core::{FakeClock, JobRecord, JobStatus, SessionId, TransportHint};

fn job(progress: u8) -> JobRecord {
    let mut job = JobRecord::new(
        JobId::new("job-1"),
        SessionId::new("sess-1"),
        "decompose",
        TransportHint::Push,
        1_000,
    );
    job.apply(
        JobPatch { status: Some(JobStatus::Running), progress: Some(progress), ..Default::default() },
        1_000,
    )
    .unwrap();
    job
}

fn progress_event(progress: u8) -> Event {
    Event::JobProgress { job: job(progress), timestamp: 0 }
}

#[test]
fn duplicate_progress_within_window_is_dropped() {
    let clock = FakeClock::new();
    let emitter = EventEmitter::new(clock.clone(), 16);
    let mut rx = emitter.subscribe();

    assert!(emitter.emit(progress_event(10)));
    clock.advance_ms(10);
    assert!(!emitter.emit(progress_event(10)));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[test]
fn changed_progress_is_not_dropped() {
    let clock = FakeClock::new();
    let emitter = EventEmitter::new(clock.clone(), 16);
    assert!(emitter.emit(progress_event(10)));
    clock.advance_ms(10);
    assert!(emitter.emit(progress_event(20)));
}

#[test]
fn duplicate_after_window_goes_through() {
    let clock = FakeClock::new();
    let emitter = EventEmitter::new(clock.clone(), 16);
    assert!(emitter.emit(progress_event(10)));
    clock.advance_ms(60);
    assert!(emitter.emit(progress_event(10)));
}

#[test]
fn terminal_progress_never_dropped() {
    let clock = FakeClock::new();
    let emitter = EventEmitter::new(clock.clone(), 16);
    let mut done = job(90);
    done.apply(
        JobPatch {
            status: Some(JobStatus::Completed),
            result: Some(serde_json::json!({"ok": true})),
            ..Default::default()
        },
        2_000,
    )
    .unwrap();
    let event = Event::JobProgress { job: done.clone(), timestamp: 0 };
    assert!(emitter.emit(event.clone()));
    assert!(emitter.emit(event));
}

#[test]
fn state_change_events_always_pass() {
    let clock = FakeClock::new();
    let emitter = EventEmitter::new(clock.clone(), 16);
    let event = Event::AgentRegistered { agent_id: "agent-1".into(), timestamp: 0 };
    assert!(emitter.emit(event.clone()));
    assert!(emitter.emit(event));
}
