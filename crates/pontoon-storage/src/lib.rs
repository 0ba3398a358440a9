// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Pontoon session bridge.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer-per-process concurrency model via `tokio-rusqlite`, and
//! typed operations for durable session metadata, the crash-safe relay
//! queue, and the TTL'd correlation store.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;

/// Queue name used for helpdesk-bound relay jobs.
pub const RELAY_QUEUE: &str = "helpdesk-relay";
