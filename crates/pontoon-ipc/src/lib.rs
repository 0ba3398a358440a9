// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Control protocol between the primary and its session workers.
//!
//! The transport is a pair of pipes (worker stdin/stdout) carrying
//! newline-delimited JSON. The protocol guarantees no delivery
//! acknowledgement; anything request-shaped is built above it from
//! correlation ids and timeouts.

pub mod codec;
pub mod message;
pub mod pending;

pub use codec::{decode, encode, write_message};
pub use message::{ControlMessage, OutboundAttachment, OutboundInstruction};
pub use pending::{new_request_id, PendingRequests};
