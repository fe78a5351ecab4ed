// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! IPC protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod wire;

pub use request::{Request, TaskSpec, ToolEnvelope};
pub use response::{Response, StatusSummary};
pub use wire::{
    decode, encode, read_message, read_message_timeout, write_message, ProtocolError,
    MAX_FRAME_LEN,
};
