// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use crate::config::DaemonConfig;
use crate::lifecycle::{startup, StartupResult};
use maestro_core::job::JobPatch;
use maestro_core::{OrchestratorConfig, SessionId, TransportHint};
use maestro_wire::{read_message, Response};
use tokio::io::duplex;

async fn daemon(dir: &tempfile::TempDir) -> StartupResult {
    let config =
        DaemonConfig::with_engine(dir.path().join("state"), OrchestratorConfig::default());
    startup(config).await.unwrap()
}

#[tokio::test]
async fn ping_round_trip_over_duplex() {
    let dir = tempfile::tempdir().unwrap();
    let state = daemon(&dir).await;
    let (mut client, server) = duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let handle = tokio::spawn(handle_connection(
        Arc::clone(&state.daemon),
        server_read,
        server_write,
        CancellationToken::new(),
    ));

    write_message(&mut client, &Request::Ping).await.unwrap();
    let response: Response = read_message(&mut client).await.unwrap();
    assert_eq!(response, Response::Pong);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn subscriber_receives_only_its_sessions_events() {
    let dir = tempfile::tempdir().unwrap();
    let state = daemon(&dir).await;
    let (mut client, server) = duplex(16 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let shutdown = CancellationToken::new();
    let _handle = tokio::spawn(handle_connection(
        Arc::clone(&state.daemon),
        server_read,
        server_write,
        shutdown.clone(),
    ));

    write_message(&mut client, &Request::Subscribe { session_id: Some(SessionId::new("sess-1")) })
        .await
        .unwrap();
    let subscribed: Response = read_message(&mut client).await.unwrap();
    assert_eq!(subscribed, Response::Subscribed);

    // traffic for another session must not reach this subscriber
    let (_other, _) =
        state.daemon.jobs.start_job(SessionId::new("sess-2"), TransportHint::Push, "noise");
    let (mine, _) =
        state.daemon.jobs.start_job(SessionId::new("sess-1"), TransportHint::Push, "orchestrate");
    state
        .daemon
        .jobs
        .update_job(&mine.job_id, JobPatch { progress: Some(25), ..Default::default() })
        .unwrap();

    // first frame for sess-1: the job start
    let frame: Response = read_message(&mut client).await.unwrap();
    let Response::Push { event } = frame else {
        panic!("expected push frame, got {frame:?}");
    };
    assert_eq!(event.session_id().map(|s| s.as_str()), Some("sess-1"));
    assert_eq!(event.job_id(), Some(&mine.job_id));

    shutdown.cancel();
}

#[tokio::test]
async fn shutdown_request_cancels_the_daemon_token() {
    let dir = tempfile::tempdir().unwrap();
    let state = daemon(&dir).await;
    let (mut client, server) = duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(handle_connection(
        Arc::clone(&state.daemon),
        server_read,
        server_write,
        shutdown.clone(),
    ));

    write_message(&mut client, &Request::Shutdown).await.unwrap();
    let response: Response = read_message(&mut client).await.unwrap();
    assert_eq!(response, Response::Ack);
    handle.await.unwrap().unwrap();
    assert!(shutdown.is_cancelled());
}
