// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session connection lifecycle for the Pontoon session bridge.
//!
//! [`SessionConnection`] is the explicit finite-state machine behind one
//! bridged session: pairing with bounded attempts, bounded reconnection
//! with backoff, idempotent quota notification, and the echo guard that
//! keeps operator sends from looping back through the relay.

pub mod echo;
pub mod pairing;
pub mod state;

pub use echo::{EchoGuard, ECHO_GUARD_TTL};
pub use pairing::{generate_outbound_id, render_challenge};
pub use state::{SessionConnection, SessionEffect, SessionPolicy};
