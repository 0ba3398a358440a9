// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relay job record queued once per normalized inbound event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::network::InboundEvent;
use crate::types::{HelpdeskMessageId, SessionId, WorkerId};

/// Immutable job payload carried by the relay queue.
///
/// Delivered at least once; the consumer's side effects (helpdesk create +
/// correlation write) are idempotent under redelivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayJob {
    pub session_id: SessionId,
    /// Helpdesk account and inbox the event is delivered to.
    pub relay_account_id: i64,
    pub relay_target_id: i64,
    pub event: InboundEvent,
    /// Reply threading hint resolved at ingestion time, if the quoted
    /// message was already correlated.
    pub reply_to: Option<HelpdeskMessageId>,
    pub context: RelayContext,
}

/// Logging context preserved across the queue hop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayContext {
    pub worker_id: WorkerId,
    pub enqueued_at: DateTime<Utc>,
}
