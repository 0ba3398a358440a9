// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Pontoon workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a bridged session (one per external inbox).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message identifier assigned by the messaging network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignMessageId(pub String);

impl std::fmt::Display for ForeignMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message identifier assigned by the helpdesk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HelpdeskMessageId(pub i64);

/// Identifier of a worker process, assigned by the primary at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub u32);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection lifecycle state of one session.
///
/// Every transition is handled exhaustively in `pontoon-session`; adding a
/// variant here is a compile error everywhere a transition is decided.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Initializing,
    Connecting,
    PairingPending,
    Open,
    Disconnected,
    PairingQuotaExceeded,
    PairingQuotaNotified,
}

/// Durable per-session metadata.
///
/// One row per session in storage; read back at startup to drive
/// reassignment. Relay targets say where inbound traffic is delivered;
/// the command origin says where status and pairing notifications go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: SessionId,
    pub display_name: String,
    /// Helpdesk inbox that receives relayed events.
    pub relay_target_id: i64,
    /// Helpdesk account owning the relay inbox.
    pub relay_account_id: i64,
    /// Conversation that issued the last management command, if any.
    pub command_origin_conversation_id: Option<i64>,
    pub command_origin_account_id: Option<i64>,
    /// Network-assigned identity, present once the session authenticated.
    pub connected_identity: Option<String>,
}

impl SessionMetadata {
    /// Whether this record carries everything needed to resume the session
    /// unattended. Incomplete records are skipped (and logged) at startup,
    /// never guessed at.
    pub fn is_complete(&self) -> bool {
        !self.display_name.trim().is_empty()
            && self.relay_target_id > 0
            && self.relay_account_id > 0
    }

    /// Merge fresh command metadata over this record. Identity is kept:
    /// a management command never un-authenticates a session by itself.
    pub fn merge_command(&mut self, incoming: &SessionMetadata) {
        self.display_name = incoming.display_name.clone();
        self.relay_target_id = incoming.relay_target_id;
        self.relay_account_id = incoming.relay_account_id;
        if incoming.command_origin_conversation_id.is_some() {
            self.command_origin_conversation_id = incoming.command_origin_conversation_id;
            self.command_origin_account_id = incoming.command_origin_account_id;
        }
    }
}

/// Per-session status line, reported by workers and merged by the primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusReport {
    pub session_id: SessionId,
    pub worker_id: WorkerId,
    pub display_name: String,
    pub state: ConnectionState,
    pub connected_identity: Option<String>,
    pub pairing_attempts: u32,
    pub reconnect_attempts: u32,
    pub last_error: Option<String>,
    pub relay_target_id: i64,
    pub relay_account_id: i64,
}
