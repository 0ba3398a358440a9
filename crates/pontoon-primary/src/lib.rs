// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary orchestrator process internals.
//!
//! The primary is the sole source of truth for session ownership. It never
//! holds a protocol connection itself: it supervises worker processes,
//! routes commands and sends to the owning worker, resumes persisted
//! sessions at startup, and aggregates status across the pool.

pub mod assignment;
pub mod http;
pub mod status;
pub mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use pontoon_config::PontoonConfig;
use pontoon_core::{PontoonError, SessionId, SessionMetadata, SessionStatusReport, WorkerId};
use pontoon_ipc::{ControlMessage, OutboundInstruction, PendingRequests};
use pontoon_storage::queries::sessions as session_store;
use pontoon_storage::Database;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::assignment::AssignmentTable;
use crate::supervisor::{PrimaryEvent, WorkerPool};

/// Port offset of the primary's management surface above the worker base
/// port.
pub const PRIMARY_PORT_OFFSET: u16 = 100;

/// Shared state of the primary process.
pub struct Primary {
    pub config: PontoonConfig,
    pub pool: WorkerPool,
    pub assignments: AssignmentTable,
    pub pending_status: PendingRequests<Vec<SessionStatusReport>>,
    pub db: Database,
}

impl Primary {
    /// Build the primary and the receiving end of its event channel.
    pub async fn new(
        config: PontoonConfig,
    ) -> Result<(Arc<Self>, mpsc::Receiver<PrimaryEvent>), PontoonError> {
        let db = Database::open(&config.storage.database_path).await?;
        let (events_tx, events_rx) = mpsc::channel(256);
        let primary = Arc::new(Self {
            config,
            pool: WorkerPool::new(events_tx),
            assignments: AssignmentTable::new(),
            pending_status: PendingRequests::new(),
            db,
        });
        Ok((primary, events_rx))
    }

    /// Number of workers to run: one per core, capped by configuration.
    pub fn target_worker_count(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        match self.config.server.worker_count {
            0 => cores,
            n => n.min(cores),
        }
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.config.server.status_timeout_ms)
    }
}

/// Route a session command: sticky owner if alive, else fresh round-robin,
/// recorded before dispatch.
pub async fn assign(
    primary: &Primary,
    session_id: SessionId,
    metadata: SessionMetadata,
    is_startup_reassignment: bool,
) -> Result<WorkerId, PontoonError> {
    let live = primary.pool.live_workers();
    let Some(worker_id) = primary
        .assignments
        .assign_sticky(&session_id, &metadata, &live)
    else {
        return Err(PontoonError::Internal(
            "no live workers available for assignment".into(),
        ));
    };

    let message = if is_startup_reassignment {
        ControlMessage::ResumeSession {
            session_id: session_id.clone(),
            metadata,
        }
    } else {
        ControlMessage::AssignSession {
            session_id: session_id.clone(),
            metadata,
        }
    };

    match primary.pool.send(worker_id, message).await {
        Ok(()) => {
            info!(
                session_id = %session_id,
                worker_id = %worker_id,
                startup = is_startup_reassignment,
                "session dispatched"
            );
            Ok(worker_id)
        }
        Err(e) => {
            // The worker died between liveness check and dispatch; drop the
            // recording so the next command reassigns fresh.
            primary.assignments.remove(&session_id);
            Err(e)
        }
    }
}

/// Forward a helpdesk-originated send to the owning worker.
pub async fn route_outbound(
    primary: &Primary,
    instruction: OutboundInstruction,
) -> Result<(), PontoonError> {
    let session_id = instruction.session_id.clone();
    let owner = primary
        .assignments
        .current_owner(&session_id)
        .filter(|w| primary.pool.is_live(*w))
        .ok_or(PontoonError::SessionUnassigned {
            session_id: session_id.clone(),
        })?;

    primary
        .pool
        .send(owner, ControlMessage::SendOutboundMessage { instruction })
        .await
}

/// Resume every durably persisted session with complete metadata.
///
/// Sessions with incomplete metadata are skipped and logged, never guessed
/// at. Returns how many sessions were dispatched.
pub async fn reassign_on_startup(primary: &Primary) -> Result<usize, PontoonError> {
    let rows = session_store::list_sessions(&primary.db).await?;
    info!(count = rows.len(), "startup reassignment beginning");

    let mut resumed = 0usize;
    for row in rows {
        let metadata = row.into_metadata();
        let session_id = metadata.session_id.clone();
        if !metadata.is_complete() {
            warn!(
                session_id = %session_id,
                "persisted metadata incomplete, session not resumed"
            );
            continue;
        }
        match assign(primary, session_id.clone(), metadata, true).await {
            Ok(_) => resumed += 1,
            Err(e) => error!(session_id = %session_id, error = %e, "startup resume failed"),
        }
    }
    info!(resumed, "startup reassignment complete");
    Ok(resumed)
}

/// Handle one message a worker pushed up.
pub async fn handle_worker_message(primary: &Primary, from: WorkerId, msg: ControlMessage) {
    match msg {
        ControlMessage::RequestAssign {
            session_id,
            metadata,
            requesting_worker,
        } => {
            info!(
                session_id = %session_id,
                requesting_worker = %requesting_worker,
                "assignment requested"
            );
            if let Err(e) = assign(primary, session_id, metadata, false).await {
                error!(error = %e, "assignment failed");
            }
        }
        ControlMessage::StatusResponse {
            request_id,
            worker_id,
            sessions,
        } => {
            let key = status::status_key(&request_id, worker_id);
            if !primary.pending_status.complete(&key, sessions) {
                warn!(
                    request_id = %request_id,
                    worker_id = %worker_id,
                    "stale status response dropped"
                );
            }
        }
        ControlMessage::SendOutboundMessage { instruction } => {
            let session_id = instruction.session_id.clone();
            if let Err(e) = route_outbound(primary, instruction).await {
                // Routing failures surface to the initiator immediately;
                // the orchestrator itself never retries.
                error!(session_id = %session_id, error = %e, "outbound routing failed");
            }
        }
        ControlMessage::AssignSession { session_id, .. }
        | ControlMessage::ResumeSession { session_id, .. } => {
            warn!(from = %from, session_id = %session_id, "worker-bound message from worker ignored");
        }
        ControlMessage::StatusRequest { request_id } => {
            warn!(from = %from, request_id = %request_id, "worker-bound message from worker ignored");
        }
        ControlMessage::Unknown => {
            warn!(from = %from, "unknown worker message ignored");
        }
    }
}

/// Whether a worker that exited with `code` should be replaced.
pub fn should_respawn(code: Option<i32>) -> bool {
    code != Some(0)
}

/// Handle a worker's exit: purge its assignments atomically with its
/// removal from the pool, then replace it if the exit was abnormal.
pub async fn handle_worker_exit(primary: &Primary, worker_id: WorkerId, code: Option<i32>) {
    error!(worker_id = %worker_id, code = ?code, "worker exited");
    primary.pool.remove(worker_id);
    let purged = primary.assignments.purge_worker(worker_id);
    if !purged.is_empty() {
        info!(
            worker_id = %worker_id,
            sessions = purged.len(),
            "assignments purged for dead worker"
        );
    }

    if should_respawn(code) {
        info!("replacing dead worker");
        match primary.pool.spawn_worker().await {
            Ok(new_id) => info!(worker_id = %new_id, "replacement worker spawned"),
            Err(e) => error!(error = %e, "replacement spawn failed"),
        }
    }
}

/// Run the primary: spawn the pool, resume persisted sessions, serve the
/// management surface, then process events until shutdown.
pub async fn run(
    primary: Arc<Primary>,
    mut events_rx: mpsc::Receiver<PrimaryEvent>,
) -> Result<(), PontoonError> {
    let target = primary.target_worker_count();
    info!(workers = target, "starting worker pool");
    for _ in 0..target {
        primary.pool.spawn_worker().await?;
    }

    reassign_on_startup(&primary).await?;

    {
        let primary = primary.clone();
        let port = primary.config.server.http_port + PRIMARY_PORT_OFFSET;
        tokio::spawn(async move {
            if let Err(e) = http::serve(primary, port).await {
                error!(error = %e, "primary management surface failed");
            }
        });
    }

    while let Some(event) = events_rx.recv().await {
        match event {
            PrimaryEvent::FromWorker { worker_id, message } => {
                handle_worker_message(&primary, worker_id, message).await;
            }
            PrimaryEvent::WorkerExited { worker_id, code } => {
                handle_worker_exit(&primary, worker_id, code).await;
            }
        }
    }
    info!("primary event channel closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pontoon_core::ConnectionState;
    use pontoon_ipc::OutboundInstruction;

    async fn test_primary() -> (Arc<Primary>, mpsc::Receiver<PrimaryEvent>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = pontoon_config::load_config_from_str("").unwrap();
        config.storage.database_path =
            dir.path().join("p.db").to_str().unwrap().to_string();
        config.helpdesk.access_token = Some("token".into());
        let (primary, events_rx) = Primary::new(config).await.unwrap();
        (primary, events_rx, dir)
    }

    fn fake_worker(
        primary: &Primary,
        id: u32,
    ) -> mpsc::Receiver<ControlMessage> {
        let (tx, rx) = mpsc::channel(32);
        primary.pool.register_handle(WorkerId(id), tx);
        rx
    }

    fn meta(id: &str) -> SessionMetadata {
        SessionMetadata {
            session_id: SessionId(id.into()),
            display_name: format!("Inbox {id}"),
            relay_target_id: 7,
            relay_account_id: 1,
            command_origin_conversation_id: Some(42),
            command_origin_account_id: Some(1),
            connected_identity: None,
        }
    }

    fn instruction(session: &str) -> OutboundInstruction {
        OutboundInstruction {
            session_id: SessionId(session.into()),
            recipient: "5585999990000".into(),
            content: Some("hi".into()),
            helpdesk_message_id: pontoon_core::HelpdeskMessageId(1),
            attachment: None,
            quote: None,
        }
    }

    #[tokio::test]
    async fn request_assign_dispatches_to_owner() {
        let (primary, _events, _dir) = test_primary().await;
        let mut w1 = fake_worker(&primary, 1);
        let _w2 = fake_worker(&primary, 2);

        handle_worker_message(
            &primary,
            WorkerId(2),
            ControlMessage::RequestAssign {
                session_id: SessionId("7".into()),
                metadata: meta("7"),
                requesting_worker: WorkerId(2),
            },
        )
        .await;

        // Round-robin starts at worker 1.
        match w1.recv().await.unwrap() {
            ControlMessage::AssignSession { session_id, .. } => {
                assert_eq!(session_id, SessionId("7".into()));
            }
            other => panic!("expected AssignSession, got {other:?}"),
        }

        // A second command for the same session sticks to worker 1.
        handle_worker_message(
            &primary,
            WorkerId(2),
            ControlMessage::RequestAssign {
                session_id: SessionId("7".into()),
                metadata: meta("7"),
                requesting_worker: WorkerId(2),
            },
        )
        .await;
        assert!(matches!(
            w1.recv().await.unwrap(),
            ControlMessage::AssignSession { .. }
        ));
    }

    #[tokio::test]
    async fn route_outbound_requires_assignment() {
        let (primary, _events, _dir) = test_primary().await;
        let _w1 = fake_worker(&primary, 1);

        let err = route_outbound(&primary, instruction("unassigned"))
            .await
            .unwrap_err();
        assert!(matches!(err, PontoonError::SessionUnassigned { .. }));
    }

    #[tokio::test]
    async fn route_outbound_reaches_owning_worker() {
        let (primary, _events, _dir) = test_primary().await;
        let mut w1 = fake_worker(&primary, 1);

        assign(&primary, SessionId("7".into()), meta("7"), false)
            .await
            .unwrap();
        let _ = w1.recv().await; // drain the AssignSession

        route_outbound(&primary, instruction("7")).await.unwrap();
        match w1.recv().await.unwrap() {
            ControlMessage::SendOutboundMessage { instruction } => {
                assert_eq!(instruction.session_id, SessionId("7".into()));
            }
            other => panic!("expected SendOutboundMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dead_worker_purges_assignments_and_never_receives_again() {
        let (primary, _events, _dir) = test_primary().await;
        let mut w1 = fake_worker(&primary, 1);
        let mut w2 = fake_worker(&primary, 2);

        assign(&primary, SessionId("s1".into()), meta("s1"), false)
            .await
            .unwrap();
        assign(&primary, SessionId("s2".into()), meta("s2"), false)
            .await
            .unwrap();
        let _ = w1.recv().await;
        let _ = w2.recv().await;
        assert_eq!(primary.assignments.len(), 2);

        // Worker 1 held s1; it exits cleanly (no respawn path in tests).
        handle_worker_exit(&primary, WorkerId(1), Some(0)).await;
        assert_eq!(primary.assignments.len(), 1);
        assert!(!primary.pool.is_live(WorkerId(1)));

        // s1 sends now fail until a new command reassigns...
        let err = route_outbound(&primary, instruction("s1")).await.unwrap_err();
        assert!(matches!(err, PontoonError::SessionUnassigned { .. }));

        // ...and the reassignment lands on the surviving worker.
        let owner = assign(&primary, SessionId("s1".into()), meta("s1"), false)
            .await
            .unwrap();
        assert_eq!(owner, WorkerId(2));
    }

    #[tokio::test]
    async fn startup_reassignment_resumes_only_complete_sessions() {
        let (primary, _events, _dir) = test_primary().await;
        let mut w1 = fake_worker(&primary, 1);

        session_store::upsert_session(&primary.db, &meta("good"))
            .await
            .unwrap();
        let mut incomplete = meta("incomplete");
        incomplete.relay_target_id = 0;
        session_store::upsert_session(&primary.db, &incomplete)
            .await
            .unwrap();

        let resumed = reassign_on_startup(&primary).await.unwrap();
        assert_eq!(resumed, 1);

        match w1.recv().await.unwrap() {
            ControlMessage::ResumeSession { session_id, .. } => {
                assert_eq!(session_id, SessionId("good".into()));
            }
            other => panic!("expected ResumeSession, got {other:?}"),
        }
        assert!(w1.try_recv().is_err());
    }

    #[tokio::test]
    async fn startup_reassignment_is_deterministic() {
        let (primary_a, _ea, _da) = test_primary().await;
        let (primary_b, _eb, _db_dir) = test_primary().await;

        for primary in [&primary_a, &primary_b] {
            let _w1 = fake_worker(primary, 1);
            let _w2 = fake_worker(primary, 2);
            for id in ["s1", "s2", "s3", "s4", "s5"] {
                session_store::upsert_session(&primary.db, &meta(id))
                    .await
                    .unwrap();
            }
            reassign_on_startup(primary).await.unwrap();
        }

        for id in ["s1", "s2", "s3", "s4", "s5"] {
            let sid = SessionId(id.into());
            assert_eq!(
                primary_a.assignments.current_owner(&sid),
                primary_b.assignments.current_owner(&sid),
                "distribution diverged for {id}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn aggregate_status_times_out_silent_workers() {
        let (primary, _events, _dir) = test_primary().await;
        let mut responsive = fake_worker(&primary, 1);
        let _silent = fake_worker(&primary, 2);

        // Answer worker 1's status request as soon as it arrives.
        let primary_clone = primary.clone();
        tokio::spawn(async move {
            if let Some(ControlMessage::StatusRequest { request_id }) = responsive.recv().await {
                handle_worker_message(
                    &primary_clone,
                    WorkerId(1),
                    ControlMessage::StatusResponse {
                        request_id,
                        worker_id: WorkerId(1),
                        sessions: vec![pontoon_core::SessionStatusReport {
                            session_id: SessionId("7".into()),
                            worker_id: WorkerId(1),
                            display_name: "Support".into(),
                            state: ConnectionState::Open,
                            connected_identity: Some("55@contact".into()),
                            pairing_attempts: 0,
                            reconnect_attempts: 0,
                            last_error: None,
                            relay_target_id: 7,
                            relay_account_id: 1,
                        }],
                    },
                )
                .await;
            }
        });

        let global =
            status::aggregate_status(&primary, Duration::from_secs(5)).await;

        assert_eq!(global.workers_queried, 2);
        assert_eq!(global.workers_responded, 1);
        assert_eq!(global.total_sessions, 1);
        let outcomes: std::collections::HashMap<u32, &str> = global
            .workers
            .iter()
            .map(|w| (w.worker_id.0, w.outcome.as_str()))
            .collect();
        assert_eq!(outcomes[&1], "ok");
        assert_eq!(outcomes[&2], "timeout");
    }

    #[test]
    fn respawn_policy_follows_exit_code() {
        assert!(!should_respawn(Some(0)));
        assert!(should_respawn(Some(1)));
        assert!(should_respawn(None));
    }
}
