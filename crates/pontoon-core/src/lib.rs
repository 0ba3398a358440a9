// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Pontoon session bridge.
//!
//! Provides the shared error type, identifier newtypes, the connection
//! state enum, durable session metadata, and the collaborator trait behind
//! which the messaging-network protocol library lives.

pub mod error;
pub mod relay;
pub mod traits;
pub mod types;

pub use error::PontoonError;
pub use relay::{RelayContext, RelayJob};
pub use traits::{
    CloseReason, EventContent, InboundEvent, MediaKind, NetworkClient, NetworkEvent,
    OutboundContent, OutboundFrame, QuoteRef,
};
pub use types::{
    ConnectionState, ForeignMessageId, HelpdeskMessageId, SessionId, SessionMetadata,
    SessionStatusReport, WorkerId,
};
