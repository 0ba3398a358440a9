// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types mirroring the database schema.

use pontoon_core::{SessionId, SessionMetadata};
use serde::{Deserialize, Serialize};

/// One row of the `sessions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub session_id: String,
    pub display_name: String,
    pub relay_target_id: i64,
    pub relay_account_id: i64,
    pub command_origin_conversation_id: Option<i64>,
    pub command_origin_account_id: Option<i64>,
    pub connected_identity: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SessionRow {
    /// Convert into the in-memory metadata type used by the rest of the
    /// system (timestamps are storage-only bookkeeping).
    pub fn into_metadata(self) -> SessionMetadata {
        SessionMetadata {
            session_id: SessionId(self.session_id),
            display_name: self.display_name,
            relay_target_id: self.relay_target_id,
            relay_account_id: self.relay_account_id,
            command_origin_conversation_id: self.command_origin_conversation_id,
            command_origin_account_id: self.command_origin_account_id,
            connected_identity: self.connected_identity,
        }
    }
}

/// One row of the `relay_queue` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
    pub next_attempt_at: Option<String>,
}
