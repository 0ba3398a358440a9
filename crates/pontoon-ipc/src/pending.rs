// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response correlation over a fire-and-forget transport.
//!
//! Each outstanding request registers a oneshot completion keyed by a
//! generated correlation id. The waiting side always resolves to a definite
//! outcome: the response, or `None` after the timeout; the map entry is
//! removed either way so late responses are dropped, not leaked.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

/// Generate a fresh correlation id.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Table of in-flight requests awaiting completion.
#[derive(Clone)]
pub struct PendingRequests<T> {
    inner: Arc<DashMap<String, oneshot::Sender<T>>>,
}

impl<T> Default for PendingRequests<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingRequests<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Register an outstanding request, returning its completion handle.
    pub fn register(&self, id: &str) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        self.inner.insert(id.to_string(), tx);
        rx
    }

    /// Complete a request by id. Returns `false` when the id is unknown
    /// (already timed out, or never registered).
    pub fn complete(&self, id: &str, value: T) -> bool {
        match self.inner.remove(id) {
            Some((_, tx)) => tx.send(value).is_ok(),
            None => {
                debug!(request_id = id, "completion for unknown request dropped");
                false
            }
        }
    }

    /// Await a registered request, resolving to `None` on timeout or if
    /// the sender side went away. The table entry is removed in all cases.
    pub async fn wait(
        &self,
        id: &str,
        rx: oneshot::Receiver<T>,
        timeout: Duration,
    ) -> Option<T> {
        let outcome = tokio::time::timeout(timeout, rx).await;
        match outcome {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) => {
                self.inner.remove(id);
                None
            }
            Err(_) => {
                debug!(request_id = id, "request timed out");
                self.inner.remove(id);
                None
            }
        }
    }

    /// Number of requests still awaiting completion.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
