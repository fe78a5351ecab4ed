// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Listener task for handling socket I/O.
//!
//! Accepts connections and handles them without blocking the engine loop.
//! A `Subscribe` request upgrades the connection into a push stream fed
//! from the broadcast emitter.

use std::sync::Arc;
use std::time::Duration;

use maestro_wire::{read_message_timeout, write_message, ProtocolError, Request, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::handlers::dispatch;
use crate::lifecycle::DaemonState;

/// Read timeout for the first request on a connection.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Accept loop; one spawned task per connection.
pub async fn run(
    daemon: Arc<DaemonState>,
    listener: UnixListener,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, _)) => {
                let daemon = Arc::clone(&daemon);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let (reader, writer) = stream.into_split();
                    if let Err(e) = handle_connection(daemon, reader, writer, shutdown).await {
                        log_connection_error(e);
                    }
                });
            }
            Err(e) => error!(error = %e, "accept failed"),
        }
    }
    debug!("listener stopped");
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => warn!("connection timed out"),
        other => error!(error = %other, "connection error"),
    }
}

/// Handle a single client connection.
///
/// Generic over reader/writer so the protocol tests can drive it over an
/// in-memory duplex pipe.
pub async fn handle_connection<R, W>(
    daemon: Arc<DaemonState>,
    mut reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let request: Request = read_message_timeout(&mut reader, REQUEST_TIMEOUT).await?;
    match request {
        Request::Subscribe { session_id } => {
            // subscribe before acking so no event slips through the gap
            let events = daemon.emitter.subscribe();
            write_message(&mut writer, &Response::Subscribed).await?;
            stream_events(events, writer, session_id, shutdown).await
        }
        Request::Shutdown => {
            write_message(&mut writer, &Response::Ack).await?;
            shutdown.cancel();
            Ok(())
        }
        request => {
            let response = dispatch(&daemon, request).await;
            write_message(&mut writer, &response).await
        }
    }
}

/// Forward matching events until the client goes away or the daemon stops.
async fn stream_events<W>(
    mut events: broadcast::Receiver<maestro_core::Event>,
    mut writer: W,
    session_id: Option<maestro_core::SessionId>,
    shutdown: CancellationToken,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };
        // session-scoped subscribers only see their own traffic
        if let Some(session_id) = &session_id {
            if event.session_id() != Some(session_id) {
                continue;
            }
        }
        if let Err(e) = write_message(&mut writer, &Response::Push { event }).await {
            debug!(error = %e, "push subscriber dropped");
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
