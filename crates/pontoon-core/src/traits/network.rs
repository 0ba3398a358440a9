// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging-network collaborator boundary.
//!
//! The protocol library itself (wire format, cryptography, media transcoding)
//! lives behind this trait. The core only sees normalized events and issues
//! coarse-grained commands against one session at a time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::PontoonError;
use crate::types::{ForeignMessageId, SessionId};

/// Address suffix for direct (one-to-one) chats.
pub const DIRECT_ADDRESS_SUFFIX: &str = "@contact";

/// Address suffix for group chats.
pub const GROUP_ADDRESS_SUFFIX: &str = "@group";

/// Why a connection closed. Terminal reasons purge credentials and are
/// never auto-retried; everything else goes through the bounded reconnect
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Explicit logout from this or another device.
    LoggedOut,
    /// The session was replaced by a connection elsewhere.
    Replaced,
    /// Anything else: network instability, protocol hiccups, timeouts.
    Transient,
}

impl CloseReason {
    pub fn is_terminal(self) -> bool {
        matches!(self, CloseReason::LoggedOut | CloseReason::Replaced)
    }
}

/// Normalized content of an inbound event. A closed set: anything the
/// decoder cannot classify arrives as `Unsupported` and is relayed as a
/// placeholder, never dropped silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventContent {
    Text { body: String },
    Media {
        reference: String,
        media: MediaKind,
        caption: Option<String>,
        file_name: Option<String>,
        mime_type: Option<String>,
    },
    Unsupported { label: String },
}

/// Media classification shared by both directions of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Voice,
    Document,
    Video,
}

/// One normalized inbound event as delivered by the protocol collaborator.
///
/// The collaborator may redeliver events; the core is idempotent against
/// that via the echo guard and correlation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub foreign_id: ForeignMessageId,
    /// Network address of the chat partner (person or group).
    pub sender: String,
    /// Display name supplied by the network, when known.
    pub sender_display_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content: EventContent,
    /// Set when the network reports this event as sent by our own identity.
    pub is_self_sent: bool,
    pub is_group: bool,
    /// Foreign id of the message this one quotes, if it is a reply.
    pub quoted_foreign_id: Option<ForeignMessageId>,
}

/// Events emitted on a session's connection stream.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// A pairing challenge (QR payload / code) that must be shown to the
    /// operator to bind the session to an account.
    PairingChallenge { payload: String },
    /// The session authenticated; `identity` is the network-assigned id.
    Opened { identity: String },
    /// The connection closed.
    Closed { reason: CloseReason, detail: String },
    /// A normalized inbound message event.
    Message(InboundEvent),
}

/// Reference to a message being quoted in an outbound send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRef {
    pub foreign_id: ForeignMessageId,
    /// Group participant that authored the quoted message, when relevant.
    pub participant: Option<String>,
    pub from_self: bool,
    /// Short text preview used by networks that echo the quote inline.
    pub preview: String,
}

/// Outbound payload handed to the protocol collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundContent {
    Text { body: String },
    Media {
        url: String,
        media: MediaKind,
        caption: Option<String>,
        file_name: Option<String>,
        mime_type: Option<String>,
    },
}

/// A fully-addressed outbound transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    /// Pre-generated message id. Registered with the echo guard before
    /// transmission so the connection's own echo is recognized.
    pub message_id: ForeignMessageId,
    /// Network address of the recipient.
    pub target: String,
    pub content: OutboundContent,
    pub quote: Option<QuoteRef>,
}

/// Stream of events for one live connection attempt.
pub type NetworkEventStream = mpsc::Receiver<NetworkEvent>;

/// Client for the external messaging network, scoped per session.
///
/// One implementation serves every session; all operations are keyed by
/// `SessionId` because credentials and connection state are per-session.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Begin a connection attempt for the session, returning its event
    /// stream. The stream ends when the connection closes.
    async fn connect(&self, session_id: &SessionId) -> Result<NetworkEventStream, PontoonError>;

    /// Transmit a frame on an open session. Returns the foreign id the
    /// network recorded for the message (normally `frame.message_id`).
    async fn transmit(
        &self,
        session_id: &SessionId,
        frame: OutboundFrame,
    ) -> Result<ForeignMessageId, PontoonError>;

    /// Explicitly log the session out, invalidating its binding.
    async fn logout(&self, session_id: &SessionId) -> Result<(), PontoonError>;

    /// Lightweight liveness probe against an open session.
    async fn probe(&self, session_id: &SessionId) -> Result<(), PontoonError>;

    /// Remove stored authentication material for the session.
    async fn purge_credentials(&self, session_id: &SessionId) -> Result<(), PontoonError>;
}
