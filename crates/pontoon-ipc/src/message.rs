// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the primary <-> worker control protocol.
//!
//! Pure data, 1:1 with what crosses the pipe. Every message is one-way and
//! fire-and-forget at the transport level; request/response semantics exist
//! only through correlation ids plus timeouts (see [`crate::pending`]).

use pontoon_core::{
    HelpdeskMessageId, MediaKind, QuoteRef, SessionId, SessionMetadata, SessionStatusReport,
    WorkerId,
};
use serde::{Deserialize, Serialize};

/// Attachment reference carried by an outbound instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundAttachment {
    pub url: String,
    pub media: MediaKind,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// A helpdesk-originated send, routed to the worker owning the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundInstruction {
    pub session_id: SessionId,
    /// Raw recipient identifier as supplied by the helpdesk (phone number
    /// or full network address); normalized by the owning worker.
    pub recipient: String,
    pub content: Option<String>,
    /// Helpdesk id of the originating message, recorded in the correlation
    /// store once the network assigns its own id.
    pub helpdesk_message_id: HelpdeskMessageId,
    pub attachment: Option<OutboundAttachment>,
    pub quote: Option<QuoteRef>,
}

/// The closed control-protocol message set.
///
/// Unrecognized types deserialize to `Unknown`, which receivers log and
/// drop; the protocol never fails on a message it does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Primary -> worker: take ownership of a session in response to an
    /// operator command. May force re-pairing of an open session.
    AssignSession {
        session_id: SessionId,
        metadata: SessionMetadata,
    },
    /// Primary -> worker: resume a persisted session at startup. Unlike
    /// `AssignSession` this must never invalidate an already-open session.
    ResumeSession {
        session_id: SessionId,
        metadata: SessionMetadata,
    },
    /// Worker -> primary: an operator command arrived at this worker's
    /// webhook; the primary decides which worker owns the session.
    RequestAssign {
        session_id: SessionId,
        metadata: SessionMetadata,
        requesting_worker: WorkerId,
    },
    /// Primary -> worker: report status for every owned session.
    StatusRequest { request_id: String },
    /// Worker -> primary: response correlated by `request_id`.
    StatusResponse {
        request_id: String,
        worker_id: WorkerId,
        sessions: Vec<SessionStatusReport>,
    },
    /// Routed to the owning worker for transmission; also sent worker ->
    /// primary when a webhook receives a send for a session the receiving
    /// worker does not own.
    SendOutboundMessage { instruction: OutboundInstruction },
    /// Catch-all: logged and ignored.
    #[serde(other)]
    Unknown,
}
