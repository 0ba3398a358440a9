// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay queue consumer.
//!
//! Polls the crash-safe queue, delivers each job to the helpdesk, records
//! the resulting id in the correlation store, and acks. Failures go back
//! through the queue's bounded-retry policy; exhausted jobs are parked as
//! failed for inspection. Delivery is at-least-once and may reorder under
//! retry, which the idempotent correlation writes absorb.

use std::time::Duration;

use pontoon_config::PontoonConfig;
use pontoon_core::{EventContent, HelpdeskMessageId, PontoonError, RelayJob};
use pontoon_helpdesk::{ContentAttributes, HelpdeskClient, RelayMessageRequest};
use pontoon_storage::queries::{correlation, queue};
use pontoon_storage::{Database, QueueEntry, RELAY_QUEUE};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How often maintenance (lock reaping, correlation expiry purge) runs,
/// measured in poll ticks.
const MAINTENANCE_EVERY_TICKS: u64 = 120;

/// The relay consumer. One per process; run several processes for more
/// delivery throughput.
pub struct RelayConsumer {
    db: Database,
    helpdesk: HelpdeskClient,
    backoff_ms: u64,
    poll_interval: Duration,
    correlation_ttl_secs: u64,
}

impl RelayConsumer {
    pub fn new(db: Database, helpdesk: HelpdeskClient, config: &PontoonConfig) -> Self {
        Self {
            db,
            helpdesk,
            backoff_ms: config.relay.backoff_ms,
            poll_interval: Duration::from_millis(config.relay.poll_interval_ms),
            correlation_ttl_secs: config.correlation.ttl_secs,
        }
    }

    /// Consume until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), PontoonError> {
        info!("relay consumer running");
        let mut ticks: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                info!("relay consumer shutting down");
                return Ok(());
            }

            ticks += 1;
            if ticks % MAINTENANCE_EVERY_TICKS == 1 {
                self.run_maintenance().await;
            }

            match self.process_next().await {
                Ok(true) => {
                    // Drain eagerly while the queue has work.
                    continue;
                }
                Ok(false) => {}
                Err(e) => error!(error = %e, "queue poll failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Reap stale processing locks (crashed consumers) and expired
    /// correlation entries.
    async fn run_maintenance(&self) {
        match queue::reap_expired_locks(&self.db, RELAY_QUEUE).await {
            Ok(0) => {}
            Ok(reaped) => warn!(reaped, "stale processing locks returned to the queue"),
            Err(e) => error!(error = %e, "lock reaping failed"),
        }
        match correlation::purge_expired(&self.db).await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "expired correlation entries removed"),
            Err(e) => error!(error = %e, "correlation purge failed"),
        }
    }

    /// Process at most one queue entry. Returns whether one was handled.
    pub async fn process_next(&self) -> Result<bool, PontoonError> {
        let Some(entry) = queue::dequeue(&self.db, RELAY_QUEUE).await? else {
            return Ok(false);
        };
        self.process_entry(entry).await;
        Ok(true)
    }

    async fn process_entry(&self, entry: QueueEntry) {
        let job: RelayJob = match serde_json::from_str(&entry.payload) {
            Ok(job) => job,
            Err(e) => {
                // An undecodable payload can never succeed; let the retry
                // budget park it as failed for inspection.
                error!(job_id = entry.id, error = %e, "relay payload not decodable");
                if let Err(e) = queue::fail(&self.db, entry.id, self.backoff_ms).await {
                    error!(job_id = entry.id, error = %e, "queue fail-mark failed");
                }
                return;
            }
        };

        debug!(
            job_id = entry.id,
            session_id = %job.session_id,
            foreign_id = %job.event.foreign_id,
            attempt = entry.attempts + 1,
            max_attempts = entry.max_attempts,
            "delivering relay job"
        );

        match self.deliver(&job).await {
            Ok(helpdesk_id) => {
                if let Err(e) = correlation::put(
                    &self.db,
                    &job.event.foreign_id.0,
                    helpdesk_id,
                    self.correlation_ttl_secs,
                )
                .await
                {
                    // Thread linkage degrades; delivery itself succeeded.
                    warn!(job_id = entry.id, error = %e, "correlation record failed");
                }
                if let Err(e) = queue::ack(&self.db, entry.id).await {
                    error!(job_id = entry.id, error = %e, "ack failed, job may redeliver");
                }
                info!(
                    job_id = entry.id,
                    session_id = %job.session_id,
                    helpdesk_id = helpdesk_id.0,
                    "relay job delivered"
                );
            }
            Err(e) => {
                warn!(
                    job_id = entry.id,
                    session_id = %job.session_id,
                    attempt = entry.attempts + 1,
                    error = %e,
                    "delivery failed, queued for retry"
                );
                if let Err(e) = queue::fail(&self.db, entry.id, self.backoff_ms).await {
                    error!(job_id = entry.id, error = %e, "queue fail-mark failed");
                }
            }
        }
    }

    /// Deliver one job to the helpdesk, resolving reply threading.
    async fn deliver(&self, job: &RelayJob) -> Result<HelpdeskMessageId, PontoonError> {
        // The ingestion-time hint wins; otherwise try a late lookup in
        // case the mapping arrived after the event was enqueued.
        let reply_to = match job.reply_to {
            Some(id) => Some(id),
            None => match &job.event.quoted_foreign_id {
                Some(quoted) => correlation::get(&self.db, &quoted.0).await.unwrap_or(None),
                None => None,
            },
        };

        let (content, attachment_url) = render_content(&job.event.content);
        let request = RelayMessageRequest {
            content,
            message_type: if job.event.is_self_sent {
                "outgoing".to_string()
            } else {
                "incoming".to_string()
            },
            source_id: job.event.foreign_id.0.clone(),
            sender_identifier: job.event.sender.clone(),
            sender_name: job.event.sender_display_name.clone(),
            attachment_url,
            content_attributes: ContentAttributes {
                in_reply_to: reply_to.map(|id| id.0),
            },
        };

        self.helpdesk
            .relay_event(job.relay_account_id, job.relay_target_id, &request)
            .await
    }
}

/// Flatten normalized event content into helpdesk message text plus an
/// optional attachment reference.
fn render_content(content: &EventContent) -> (String, Option<String>) {
    match content {
        EventContent::Text { body } => (body.clone(), None),
        EventContent::Media {
            reference,
            caption,
            file_name,
            ..
        } => {
            let text = caption.clone().unwrap_or_else(|| {
                format!("[media: {}]", file_name.as_deref().unwrap_or("attachment"))
            });
            (text, Some(reference.clone()))
        }
        EventContent::Unsupported { label } => (format!("[unsupported: {label}]"), None),
    }
}
