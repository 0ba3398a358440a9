// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Pontoon session bridge.

use thiserror::Error;

use crate::types::SessionId;

/// The primary error type used across all Pontoon crates.
#[derive(Debug, Error)]
pub enum PontoonError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging-network collaborator errors (connect failure, transmit failure).
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Helpdesk API errors. Non-2xx responses land here and are retryable
    /// by the relay queue, never fatal to the process.
    #[error("helpdesk error: {message}")]
    Helpdesk {
        message: String,
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An outbound send was attempted while the session is not `open`.
    #[error("session {session_id} is not ready (state: {state})")]
    SessionNotReady { session_id: SessionId, state: String },

    /// A command was routed for a session no worker currently owns.
    #[error("session {session_id} is not assigned to any worker")]
    SessionUnassigned { session_id: SessionId },

    /// Control-protocol framing or transport errors.
    #[error("ipc error: {0}")]
    Ipc(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PontoonError {
    /// Shorthand for a network error without an underlying source.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a helpdesk error carrying an HTTP status.
    pub fn helpdesk_status(message: impl Into<String>, status: u16) -> Self {
        Self::Helpdesk {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }
}
