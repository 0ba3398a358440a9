// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session worker process internals.
//!
//! A worker owns a subset of sessions: their live connections, the echo
//! guard, event ingestion into the relay queue, and a local HTTP surface
//! (`/status`, `/webhook`). Commands arrive over stdin from the primary;
//! worker-to-primary traffic leaves over stdout. Nothing outside this
//! process ever mutates a session's live connection object.

pub mod http;
pub mod runtime;
pub mod sessions;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use pontoon_config::PontoonConfig;
use pontoon_core::{NetworkClient, PontoonError, SessionId, WorkerId};
use pontoon_helpdesk::HelpdeskClient;
use pontoon_ipc::ControlMessage;
use pontoon_session::{EchoGuard, SessionConnection, SessionPolicy};
use pontoon_storage::Database;
use tokio::sync::{mpsc, Mutex};

/// Depth of the worker -> primary outbox before webhook handlers push back.
const OUTBOX_DEPTH: usize = 256;

/// One worker process's shared state.
pub struct Worker {
    pub id: WorkerId,
    pub(crate) config: PontoonConfig,
    pub(crate) policy: SessionPolicy,
    pub(crate) db: Database,
    pub(crate) helpdesk: HelpdeskClient,
    pub(crate) network: Arc<dyn NetworkClient>,
    pub(crate) sessions: Mutex<HashMap<SessionId, SessionConnection>>,
    pub(crate) echo_guard: EchoGuard,
    pub(crate) to_primary: mpsc::Sender<ControlMessage>,
}

impl Worker {
    /// Build a worker and the receiving end of its primary-bound outbox.
    pub async fn new(
        id: WorkerId,
        config: PontoonConfig,
        network: Arc<dyn NetworkClient>,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ControlMessage>), PontoonError> {
        let db = Database::open(&config.storage.database_path).await?;
        let helpdesk = HelpdeskClient::new(&config.helpdesk)?;
        let policy = SessionPolicy {
            max_pairing_attempts: config.network.max_pairing_attempts,
            max_reconnect_attempts: config.network.max_reconnect_attempts,
            reconnect_delay: std::time::Duration::from_millis(config.network.reconnect_delay_ms),
        };
        let (to_primary, outbox_rx) = mpsc::channel(OUTBOX_DEPTH);

        let worker = Arc::new(Self {
            id,
            config,
            policy,
            db,
            helpdesk,
            network,
            sessions: Mutex::new(HashMap::new()),
            echo_guard: EchoGuard::default(),
            to_primary,
        });
        Ok((worker, outbox_rx))
    }

    /// Queue a message for the primary. Dropped (with a log line) if the
    /// outbox is gone, which only happens during shutdown.
    pub(crate) async fn send_to_primary(&self, msg: ControlMessage) {
        if self.to_primary.send(msg).await.is_err() {
            tracing::warn!(worker_id = %self.id, "primary outbox closed, message dropped");
        }
    }
}
