// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-session connection state machine.
//!
//! All transition logic lives here as plain state + returned effects; the
//! owning worker executes the effects (connect, logout, notify, persist).
//! That keeps every transition exhaustively matched and testable without
//! touching the network.

use std::time::Duration;

use pontoon_core::{
    CloseReason, ConnectionState, SessionMetadata, SessionStatusReport, WorkerId,
};
use tracing::warn;

use crate::pairing;

/// Connection policy knobs, taken from configuration.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub max_pairing_attempts: u32,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_pairing_attempts: 4,
            max_reconnect_attempts: 4,
            reconnect_delay: Duration::from_secs(10),
        }
    }
}

/// Side effects a transition asks the owning worker to perform.
///
/// Effects are returned in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Begin a connection attempt via the network client.
    StartConnection,
    /// Explicitly log the live connection out.
    Logout,
    /// Remove stored authentication material.
    PurgeCredentials,
    /// The durable metadata changed; write it back.
    PersistMetadata,
    /// Re-enter connecting after `delay` unless the state moved on.
    ScheduleReconnect {
        delay: Duration,
        attempt: u32,
        max: u32,
    },
    /// Deliver a private notification to the command-origin conversation.
    NotifyCommandOrigin { text: String },
}

/// One session's connection lifecycle, owned exclusively by its worker.
pub struct SessionConnection {
    metadata: SessionMetadata,
    state: ConnectionState,
    pairing_attempts: u32,
    reconnect_attempts: u32,
    last_error: Option<String>,
    pending_pairing_payload: Option<String>,
    /// Whether this command cycle has already reached `Open` once; gates
    /// the "connected" notification so reconnects stay quiet.
    was_previously_open: bool,
}

impl SessionConnection {
    pub fn new(metadata: SessionMetadata) -> Self {
        Self {
            metadata,
            state: ConnectionState::Initializing,
            pairing_attempts: 0,
            reconnect_attempts: 0,
            last_error: None,
            pending_pairing_payload: None,
            was_previously_open: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pairing_attempts(&self) -> u32 {
        self.pairing_attempts
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Emit a command-origin notification, or nothing when the session has
    /// no recorded origin (a resumed session may not).
    fn notify(&self, effects: &mut Vec<SessionEffect>, text: String) {
        if self.metadata.command_origin_conversation_id.is_some() {
            effects.push(SessionEffect::NotifyCommandOrigin { text });
        } else {
            warn!(
                session_id = %self.metadata.session_id,
                "no command origin recorded, dropping notification"
            );
        }
    }

    fn start_fresh_cycle(&mut self, effects: &mut Vec<SessionEffect>) {
        self.state = ConnectionState::Connecting;
        self.pairing_attempts = 0;
        self.reconnect_attempts = 0;
        self.last_error = None;
        self.pending_pairing_payload = None;
        self.was_previously_open = false;
        effects.push(SessionEffect::PersistMetadata);
        effects.push(SessionEffect::StartConnection);
    }

    /// Handle a management command (operator or startup reassignment).
    ///
    /// Idempotent: re-managing an in-progress session is a no-op, and the
    /// startup flag keeps a healthy open session untouched.
    pub fn command(
        &mut self,
        incoming: &SessionMetadata,
        is_startup_reassignment: bool,
        policy: &SessionPolicy,
    ) -> Vec<SessionEffect> {
        self.metadata.merge_command(incoming);
        let mut effects = Vec::new();

        match self.state {
            ConnectionState::Open if !is_startup_reassignment => {
                // Explicit re-pair: logout, then straight back to the start
                // of the sequence. Never passes through `Disconnected`, so
                // no auto-reconnect races the fresh pairing.
                self.notify(
                    &mut effects,
                    format!(
                        "New pairing requested for \"{}\". Disconnecting the current session...",
                        self.metadata.display_name
                    ),
                );
                effects.push(SessionEffect::Logout);
                self.state = ConnectionState::Initializing;
                self.start_fresh_cycle(&mut effects);
            }
            ConnectionState::Open => {
                // Startup reassignment found a healthy session: only the
                // merged metadata needs to go back to disk.
                effects.push(SessionEffect::PersistMetadata);
            }
            ConnectionState::PairingPending if !is_startup_reassignment => {
                if self.pairing_attempts >= policy.max_pairing_attempts {
                    self.enter_pairing_quota(&mut effects, policy);
                } else if let Some(payload) = self.pending_pairing_payload.clone() {
                    // Re-deliver the cached challenge instead of tearing
                    // the in-flight connection down.
                    self.pairing_attempts += 1;
                    self.push_challenge_notification(&mut effects, &payload, policy);
                }
                // No cached challenge yet: the connection attempt underway
                // will deliver one.
            }
            ConnectionState::Connecting | ConnectionState::PairingPending => {
                // Already working on it.
            }
            ConnectionState::PairingQuotaExceeded | ConnectionState::PairingQuotaNotified
                if !is_startup_reassignment =>
            {
                // Only an explicit operator command leaves the quota stop.
                self.state = ConnectionState::Initializing;
                self.start_fresh_cycle(&mut effects);
            }
            ConnectionState::PairingQuotaExceeded | ConnectionState::PairingQuotaNotified => {
                // Startup reassignment never un-sticks a quota stop.
            }
            ConnectionState::Initializing | ConnectionState::Disconnected => {
                self.start_fresh_cycle(&mut effects);
            }
        }

        effects
    }

    /// A scheduled reconnect timer fired.
    pub fn reconnect_due(&mut self) -> Vec<SessionEffect> {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
            vec![SessionEffect::StartConnection]
        } else {
            // The session moved on (operator command, successful open)
            // while the timer was pending.
            Vec::new()
        }
    }

    fn push_challenge_notification(
        &self,
        effects: &mut Vec<SessionEffect>,
        payload: &str,
        policy: &SessionPolicy,
    ) {
        let rendered = match pairing::render_challenge(payload) {
            Ok(block) => block,
            Err(e) => {
                warn!(
                    session_id = %self.metadata.session_id,
                    error = %e,
                    "pairing payload could not be rendered, sending raw"
                );
                payload.to_string()
            }
        };
        self.notify(
            effects,
            format!(
                "Attempt {}/{}: scan the pairing code for \"{}\"\n{}",
                self.pairing_attempts,
                policy.max_pairing_attempts,
                self.metadata.display_name,
                rendered
            ),
        );
    }

    fn enter_pairing_quota(&mut self, effects: &mut Vec<SessionEffect>, policy: &SessionPolicy) {
        if self.state == ConnectionState::PairingQuotaNotified {
            // Already notified this episode; stay silent.
            return;
        }
        if self.metadata.command_origin_conversation_id.is_some() {
            self.notify(
                effects,
                format!(
                    "Pairing limit of {} attempts reached for \"{}\". No more codes will be \
                     sent automatically. Run the command again to retry.",
                    policy.max_pairing_attempts, self.metadata.display_name
                ),
            );
            self.state = ConnectionState::PairingQuotaNotified;
        } else {
            self.state = ConnectionState::PairingQuotaExceeded;
        }
    }

    /// The protocol layer issued a pairing challenge.
    pub fn on_pairing_challenge(
        &mut self,
        payload: String,
        policy: &SessionPolicy,
    ) -> Vec<SessionEffect> {
        let mut effects = Vec::new();

        if self.pairing_attempts >= policy.max_pairing_attempts {
            self.enter_pairing_quota(&mut effects, policy);
            return effects;
        }

        self.pending_pairing_payload = Some(payload.clone());
        self.state = ConnectionState::PairingPending;
        self.pairing_attempts += 1;
        self.push_challenge_notification(&mut effects, &payload, policy);
        effects
    }

    /// The protocol layer reports the session authenticated.
    pub fn on_opened(&mut self, identity: String) -> Vec<SessionEffect> {
        let first_open_this_cycle = !self.was_previously_open;
        self.state = ConnectionState::Open;
        self.pairing_attempts = 0;
        self.reconnect_attempts = 0;
        self.last_error = None;
        self.pending_pairing_payload = None;
        self.metadata.connected_identity = Some(identity.clone());
        self.was_previously_open = true;

        let mut effects = vec![SessionEffect::PersistMetadata];
        if first_open_this_cycle {
            self.notify(
                &mut effects,
                format!(
                    "Session \"{}\" connected. Identity: {identity}",
                    self.metadata.display_name
                ),
            );
        }
        effects
    }

    /// The protocol layer reports the connection closed.
    pub fn on_closed(
        &mut self,
        reason: CloseReason,
        detail: String,
        policy: &SessionPolicy,
    ) -> Vec<SessionEffect> {
        let mut effects = Vec::new();

        if matches!(
            self.state,
            ConnectionState::PairingQuotaExceeded | ConnectionState::PairingQuotaNotified
        ) {
            // A quota stop is already in force; the closure only ends the
            // underlying attempt. Explicit operator command required.
            self.last_error = Some(detail);
            effects.push(SessionEffect::PurgeCredentials);
            return effects;
        }

        self.last_error = Some(detail.clone());
        self.state = ConnectionState::Disconnected;

        if !reason.is_terminal() && self.reconnect_attempts < policy.max_reconnect_attempts {
            self.reconnect_attempts += 1;
            self.notify(
                &mut effects,
                format!(
                    "Connection for \"{}\" is unstable. Reconnecting... ({}/{})",
                    self.metadata.display_name,
                    self.reconnect_attempts,
                    policy.max_reconnect_attempts
                ),
            );
            effects.push(SessionEffect::ScheduleReconnect {
                delay: policy.reconnect_delay,
                attempt: self.reconnect_attempts,
                max: policy.max_reconnect_attempts,
            });
        } else if reason.is_terminal() {
            self.metadata.connected_identity = None;
            self.notify(
                &mut effects,
                format!(
                    "Connection for \"{}\" was closed. Reason: {detail}. Run the command \
                     again to pair a new session.",
                    self.metadata.display_name
                ),
            );
            effects.push(SessionEffect::PurgeCredentials);
        } else {
            // Transient failures exhausted the retry budget: recovery now
            // belongs to the operator.
            self.metadata.connected_identity = None;
            self.notify(
                &mut effects,
                format!(
                    "Connection for \"{}\" failed after {} attempts. Automatic recovery \
                     stopped. Run the command again to retry.",
                    self.metadata.display_name, policy.max_reconnect_attempts
                ),
            );
            effects.push(SessionEffect::PurgeCredentials);
        }

        effects
    }

    /// A liveness probe timed out or errored.
    pub fn health_check_failed(&mut self, policy: &SessionPolicy) -> Vec<SessionEffect> {
        self.on_closed(
            CloseReason::Transient,
            "health check failed".to_string(),
            policy,
        )
    }

    pub fn status_report(&self, worker_id: WorkerId) -> SessionStatusReport {
        SessionStatusReport {
            session_id: self.metadata.session_id.clone(),
            worker_id,
            display_name: self.metadata.display_name.clone(),
            state: self.state,
            connected_identity: self.metadata.connected_identity.clone(),
            pairing_attempts: self.pairing_attempts,
            reconnect_attempts: self.reconnect_attempts,
            last_error: self.last_error.clone(),
            relay_target_id: self.metadata.relay_target_id,
            relay_account_id: self.metadata.relay_account_id,
        }
    }
}
