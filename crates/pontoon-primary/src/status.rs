// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cluster-wide status aggregation.
//!
//! One broadcast, one correlation id, one completion per worker; a worker
//! that does not answer inside the timeout is reported as `timeout` rather
//! than holding the aggregate hostage.

use std::time::Duration;

use pontoon_core::{SessionStatusReport, WorkerId};
use pontoon_ipc::{new_request_id, ControlMessage};
use serde::Serialize;
use tracing::warn;

use crate::Primary;

/// Per-worker outcome of one aggregation round.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerOutcome {
    pub worker_id: WorkerId,
    /// "ok" or "timeout".
    pub outcome: String,
    pub session_count: usize,
}

/// The merged global view served on `/global-status`.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStatus {
    pub server_time: String,
    pub total_sessions: usize,
    pub sessions: Vec<SessionStatusReport>,
    pub workers_queried: usize,
    pub workers_responded: usize,
    pub workers: Vec<WorkerOutcome>,
}

/// Pending-table key for one (request, worker) pair.
pub(crate) fn status_key(request_id: &str, worker_id: WorkerId) -> String {
    format!("{request_id}:{worker_id}")
}

/// Broadcast a status request to every live worker and merge the replies.
pub async fn aggregate_status(primary: &Primary, timeout: Duration) -> GlobalStatus {
    let live = primary.pool.live_workers();
    let request_id = new_request_id();

    // Register completions before sending anything, so a fast reply can
    // never race an unregistered key.
    let waits: Vec<_> = live
        .iter()
        .map(|worker_id| {
            let key = status_key(&request_id, *worker_id);
            let rx = primary.pending_status.register(&key);
            (*worker_id, key, rx)
        })
        .collect();

    for worker_id in &live {
        if let Err(e) = primary
            .pool
            .send(
                *worker_id,
                ControlMessage::StatusRequest {
                    request_id: request_id.clone(),
                },
            )
            .await
        {
            warn!(worker_id = %worker_id, error = %e, "status request not delivered");
        }
    }

    let results = futures::future::join_all(waits.into_iter().map(|(worker_id, key, rx)| {
        let pending = primary.pending_status.clone();
        async move { (worker_id, pending.wait(&key, rx, timeout).await) }
    }))
    .await;

    let mut sessions = Vec::new();
    let mut workers = Vec::new();
    let mut responded = 0usize;
    for (worker_id, result) in results {
        match result {
            Some(reports) => {
                responded += 1;
                workers.push(WorkerOutcome {
                    worker_id,
                    outcome: "ok".to_string(),
                    session_count: reports.len(),
                });
                sessions.extend(reports);
            }
            None => {
                warn!(worker_id = %worker_id, "worker status timed out");
                workers.push(WorkerOutcome {
                    worker_id,
                    outcome: "timeout".to_string(),
                    session_count: 0,
                });
            }
        }
    }

    GlobalStatus {
        server_time: chrono::Utc::now().to_rfc3339(),
        total_sessions: sessions.len(),
        sessions,
        workers_queried: live.len(),
        workers_responded: responded,
        workers,
    }
}
