// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session ownership: command execution, connection event pumping, event
//! ingestion, outbound sends, and the liveness sweep.
//!
//! The registry in [`Worker::sessions`] is the only place live connection
//! state exists; every entry point locks it briefly, runs one state-machine
//! transition, and executes the returned effects outside the lock.

use std::sync::Arc;
use std::time::Duration;

use pontoon_core::traits::network::{DIRECT_ADDRESS_SUFFIX, GROUP_ADDRESS_SUFFIX};
use pontoon_core::{
    CloseReason, ConnectionState, ForeignMessageId, InboundEvent, NetworkEvent, OutboundContent,
    OutboundFrame, PontoonError, RelayContext, RelayJob, SessionId, SessionMetadata,
    SessionStatusReport,
};
use pontoon_ipc::OutboundInstruction;
use pontoon_session::{generate_outbound_id, SessionConnection, SessionEffect};
use pontoon_storage::queries::{correlation, queue, sessions as session_store};
use pontoon_storage::RELAY_QUEUE;
use tracing::{debug, error, info, warn};

use crate::Worker;

/// Idempotent management entry point, invoked for operator commands and
/// for primary-initiated startup reassignment.
pub async fn manage(
    worker: &Arc<Worker>,
    session_id: SessionId,
    metadata: SessionMetadata,
    is_startup_reassignment: bool,
) {
    info!(
        session_id = %session_id,
        worker_id = %worker.id,
        startup = is_startup_reassignment,
        "managing session"
    );
    let effects = {
        let mut sessions = worker.sessions.lock().await;
        let conn = sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionConnection::new(metadata.clone()));
        conn.command(&metadata, is_startup_reassignment, &worker.policy)
    };
    apply_effects(worker, &session_id, effects).await;
}

/// Execute the effects returned by a state-machine transition.
pub(crate) async fn apply_effects(
    worker: &Arc<Worker>,
    session_id: &SessionId,
    effects: Vec<SessionEffect>,
) {
    if effects.is_empty() {
        return;
    }
    let metadata = {
        let sessions = worker.sessions.lock().await;
        match sessions.get(session_id) {
            Some(conn) => conn.metadata().clone(),
            None => return,
        }
    };

    for effect in effects {
        match effect {
            SessionEffect::PersistMetadata => {
                if let Err(e) = session_store::upsert_session(&worker.db, &metadata).await {
                    error!(session_id = %session_id, error = %e, "failed to persist session metadata");
                }
            }
            SessionEffect::NotifyCommandOrigin { text } => {
                notify_command_origin(worker, &metadata, &text).await;
            }
            SessionEffect::Logout => {
                if let Err(e) = worker.network.logout(session_id).await {
                    warn!(session_id = %session_id, error = %e,
                          "logout failed, purging credentials instead");
                    let _ = worker.network.purge_credentials(session_id).await;
                }
            }
            SessionEffect::PurgeCredentials => {
                if let Err(e) = worker.network.purge_credentials(session_id).await {
                    warn!(session_id = %session_id, error = %e, "credential purge failed");
                }
                // The durable record must not keep claiming an identity the
                // purged credentials can no longer back.
                if let Err(e) =
                    session_store::update_connected_identity(&worker.db, &session_id.0, None).await
                {
                    warn!(session_id = %session_id, error = %e, "identity clear failed");
                }
            }
            SessionEffect::StartConnection => {
                spawn_connection(worker.clone(), session_id.clone());
            }
            SessionEffect::ScheduleReconnect {
                delay,
                attempt,
                max,
            } => {
                info!(
                    session_id = %session_id,
                    attempt,
                    max,
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
                spawn_reconnect(worker.clone(), session_id.clone(), delay);
            }
        }
    }
}

async fn notify_command_origin(worker: &Arc<Worker>, metadata: &SessionMetadata, text: &str) {
    let (Some(conversation_id), account_id) = (
        metadata.command_origin_conversation_id,
        metadata
            .command_origin_account_id
            .unwrap_or(worker.config.helpdesk.default_account_id),
    ) else {
        warn!(
            session_id = %metadata.session_id,
            "command origin incomplete, dropping notification"
        );
        return;
    };
    if let Err(e) = worker
        .helpdesk
        .notify(account_id, conversation_id, text)
        .await
    {
        // Notifications are best-effort; the session keeps running.
        warn!(session_id = %metadata.session_id, error = %e, "command-origin notification failed");
    }
}

/// Sleep for `delay`, then apply any effects the session's reconnect timer
/// produces. Lives in its own function item so the `apply_effects` call is not
/// nested inside `apply_effects`'s own body (which would form a recursive
/// opaque-future cycle the compiler cannot prove `Send`).
fn spawn_reconnect(worker: Arc<Worker>, session_id: SessionId, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let effects = {
            let mut sessions = worker.sessions.lock().await;
            sessions.get_mut(&session_id).map(|c| c.reconnect_due())
        };
        if let Some(effects) = effects {
            apply_effects(&worker, &session_id, effects).await;
        }
    });
}

/// Run one connection attempt and pump its event stream until it ends.
fn spawn_connection(worker: Arc<Worker>, session_id: SessionId) {
    tokio::spawn(async move {
        match worker.network.connect(&session_id).await {
            Ok(mut stream) => {
                debug!(session_id = %session_id, "connection stream established");
                while let Some(event) = stream.recv().await {
                    dispatch_network_event(&worker, &session_id, event).await;
                }
                debug!(session_id = %session_id, "connection stream ended");
            }
            Err(e) => {
                // Errors while establishing a connection are transient
                // closures unless the collaborator says otherwise.
                let effects = {
                    let mut sessions = worker.sessions.lock().await;
                    sessions
                        .get_mut(&session_id)
                        .map(|c| c.on_closed(CloseReason::Transient, e.to_string(), &worker.policy))
                };
                if let Some(effects) = effects {
                    apply_effects(&worker, &session_id, effects).await;
                }
            }
        }
    });
}

async fn dispatch_network_event(worker: &Arc<Worker>, session_id: &SessionId, event: NetworkEvent) {
    match event {
        NetworkEvent::PairingChallenge { payload } => {
            let effects = {
                let mut sessions = worker.sessions.lock().await;
                sessions
                    .get_mut(session_id)
                    .map(|c| c.on_pairing_challenge(payload, &worker.policy))
            };
            if let Some(effects) = effects {
                apply_effects(worker, session_id, effects).await;
            }
        }
        NetworkEvent::Opened { identity } => {
            let effects = {
                let mut sessions = worker.sessions.lock().await;
                sessions.get_mut(session_id).map(|c| c.on_opened(identity))
            };
            if let Some(effects) = effects {
                apply_effects(worker, session_id, effects).await;
            }
        }
        NetworkEvent::Closed { reason, detail } => {
            let effects = {
                let mut sessions = worker.sessions.lock().await;
                sessions
                    .get_mut(session_id)
                    .map(|c| c.on_closed(reason, detail, &worker.policy))
            };
            if let Some(effects) = effects {
                apply_effects(worker, session_id, effects).await;
            }
        }
        NetworkEvent::Message(event) => {
            handle_inbound_event(worker, session_id, event).await;
        }
    }
}

/// Normalize, echo-check, correlate, and enqueue one inbound event.
///
/// Ingestion is at-most-once by design: an enqueue failure is logged and
/// the event dropped; the network itself is the authoritative record and
/// will redeliver.
pub async fn handle_inbound_event(
    worker: &Arc<Worker>,
    session_id: &SessionId,
    event: InboundEvent,
) {
    if event.is_self_sent && worker.echo_guard.suppress(&event.foreign_id.0) {
        debug!(
            session_id = %session_id,
            foreign_id = %event.foreign_id,
            "echo of an operator send suppressed"
        );
        return;
    }

    let metadata = {
        let sessions = worker.sessions.lock().await;
        match sessions.get(session_id) {
            Some(conn) => conn.metadata().clone(),
            None => {
                warn!(session_id = %session_id, "inbound event for unowned session dropped");
                return;
            }
        }
    };
    if !metadata.is_complete() {
        error!(
            session_id = %session_id,
            "relay metadata incomplete, event not enqueued"
        );
        return;
    }

    // Reply correlation is best-effort: a miss relays without threading.
    let reply_to = match &event.quoted_foreign_id {
        Some(quoted) => match correlation::get(&worker.db, &quoted.0).await {
            Ok(found) => {
                if found.is_none() {
                    debug!(quoted = %quoted, "no correlation for quoted message");
                }
                found
            }
            Err(e) => {
                warn!(error = %e, "correlation lookup failed, relaying without threading");
                None
            }
        },
        None => None,
    };

    let job = RelayJob {
        session_id: session_id.clone(),
        relay_account_id: metadata.relay_account_id,
        relay_target_id: metadata.relay_target_id,
        event,
        reply_to,
        context: RelayContext {
            worker_id: worker.id,
            enqueued_at: chrono::Utc::now(),
        },
    };
    let payload = match serde_json::to_string(&job) {
        Ok(payload) => payload,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "relay job not serializable");
            return;
        }
    };

    let enqueue_timeout = Duration::from_millis(worker.config.relay.enqueue_timeout_ms);
    let enqueue = queue::enqueue(
        &worker.db,
        RELAY_QUEUE,
        &payload,
        worker.config.relay.max_attempts,
    );
    match tokio::time::timeout(enqueue_timeout, enqueue).await {
        Ok(Ok(job_id)) => {
            debug!(
                session_id = %session_id,
                foreign_id = %job.event.foreign_id,
                job_id,
                "relay job enqueued"
            );
        }
        Ok(Err(e)) => {
            error!(session_id = %session_id, error = %e, "enqueue failed, event dropped");
        }
        Err(_) => {
            error!(
                session_id = %session_id,
                timeout_ms = worker.config.relay.enqueue_timeout_ms,
                "enqueue timed out, event dropped"
            );
        }
    }
}

/// Transmit an operator-originated message on an open session.
///
/// The generated outbound id is armed in the echo guard before
/// transmission; retry policy belongs to the caller, not here.
pub async fn send_outbound(
    worker: &Arc<Worker>,
    instruction: OutboundInstruction,
) -> Result<ForeignMessageId, PontoonError> {
    let session_id = instruction.session_id.clone();
    let connected_identity = {
        let sessions = worker.sessions.lock().await;
        match sessions.get(&session_id) {
            Some(conn) if conn.state() == ConnectionState::Open => {
                conn.metadata().connected_identity.clone()
            }
            Some(conn) => {
                return Err(PontoonError::SessionNotReady {
                    session_id,
                    state: conn.state().to_string(),
                });
            }
            None => {
                return Err(PontoonError::SessionUnassigned { session_id });
            }
        }
    };

    let target = normalize_recipient(&instruction.recipient)?;

    let mut quote = instruction.quote;
    if let Some(q) = quote.as_mut()
        && target.ends_with(GROUP_ADDRESS_SUFFIX)
        && q.from_self
        && q.participant.is_none()
    {
        // Group quotes of our own messages need the sender participant.
        q.participant = connected_identity;
    }

    let content = match instruction.attachment {
        Some(att) => OutboundContent::Media {
            url: att.url,
            media: att.media,
            caption: instruction.content.clone(),
            file_name: att.file_name,
            mime_type: att.mime_type,
        },
        None => OutboundContent::Text {
            body: instruction.content.clone().unwrap_or_default(),
        },
    };

    let outbound_id = ForeignMessageId(generate_outbound_id());
    // Armed before transmission: the event loop may observe the echo
    // before `transmit` even returns.
    worker.echo_guard.register(&outbound_id.0);

    let frame = OutboundFrame {
        message_id: outbound_id,
        target: target.clone(),
        content,
        quote,
    };

    let sent_id = worker.network.transmit(&session_id, frame).await?;
    info!(
        session_id = %session_id,
        foreign_id = %sent_id,
        helpdesk_id = instruction.helpdesk_message_id.0,
        %target,
        "outbound message transmitted"
    );

    if let Err(e) = correlation::put(
        &worker.db,
        &sent_id.0,
        instruction.helpdesk_message_id,
        worker.config.correlation.ttl_secs,
    )
    .await
    {
        // The message is out; a lost mapping only costs reply threading.
        warn!(session_id = %session_id, error = %e, "correlation record failed");
    }

    Ok(sent_id)
}

/// Normalize a helpdesk-supplied recipient into a network address.
pub(crate) fn normalize_recipient(raw: &str) -> Result<String, PontoonError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_start_matches('+')
        .to_string();

    if cleaned.contains('@') {
        return Ok(cleaned);
    }
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Ok(format!("{cleaned}{DIRECT_ADDRESS_SUFFIX}"));
    }
    Err(PontoonError::network(format!(
        "recipient {raw:?} is neither a number nor a full network address"
    )))
}

/// Probe every open session; a probe that errors or exceeds the timeout
/// forces the session through the normal transient-failure path.
pub async fn run_health_checks(worker: &Arc<Worker>) {
    let swept = worker.echo_guard.sweep();
    if swept > 0 {
        debug!(swept, "expired echo-guard entries reaped");
    }

    let open_sessions: Vec<SessionId> = {
        let sessions = worker.sessions.lock().await;
        sessions
            .iter()
            .filter(|(_, c)| c.state() == ConnectionState::Open)
            .map(|(id, _)| id.clone())
            .collect()
    };
    if open_sessions.is_empty() {
        return;
    }
    info!(
        worker_id = %worker.id,
        count = open_sessions.len(),
        "running health checks"
    );

    let probe_timeout = Duration::from_secs(worker.config.network.health_check_timeout_secs);
    for session_id in open_sessions {
        let probe = tokio::time::timeout(probe_timeout, worker.network.probe(&session_id)).await;
        let healthy = matches!(probe, Ok(Ok(())));
        if healthy {
            debug!(session_id = %session_id, "health check passed");
            continue;
        }

        warn!(
            session_id = %session_id,
            "health check failed, forcing reconnect"
        );
        let effects = {
            let mut sessions = worker.sessions.lock().await;
            sessions.get_mut(&session_id).and_then(|c| {
                // The probe raced a state change; only an open session is
                // forced down.
                (c.state() == ConnectionState::Open)
                    .then(|| c.health_check_failed(&worker.policy))
            })
        };
        if let Some(effects) = effects {
            apply_effects(worker, &session_id, effects).await;
        }
    }
}

/// Snapshot status for every owned session.
pub async fn status_reports(worker: &Worker) -> Vec<SessionStatusReport> {
    let sessions = worker.sessions.lock().await;
    sessions
        .values()
        .map(|c| c.status_report(worker.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pontoon_core::{EventContent, HelpdeskMessageId, NetworkClient};
    use pontoon_test_utils::MockNetwork;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_worker(
        helpdesk_url: &str,
        reconnect_delay_ms: u64,
    ) -> (Arc<Worker>, Arc<MockNetwork>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = pontoon_config::load_config_from_str("").unwrap();
        config.storage.database_path = dir
            .path()
            .join("worker.db")
            .to_str()
            .unwrap()
            .to_string();
        config.helpdesk.base_url = helpdesk_url.to_string();
        config.helpdesk.access_token = Some("test-token".into());
        config.network.reconnect_delay_ms = reconnect_delay_ms;

        let network = Arc::new(MockNetwork::new());
        let (worker, _outbox) = Worker::new(
            pontoon_core::WorkerId(1),
            config,
            network.clone() as Arc<dyn NetworkClient>,
        )
        .await
        .unwrap();
        (worker, network, dir)
    }

    async fn helpdesk_stub() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
            .mount(&server)
            .await;
        server
    }

    fn meta(id: &str) -> SessionMetadata {
        SessionMetadata {
            session_id: SessionId(id.into()),
            display_name: "Support".into(),
            relay_target_id: 7,
            relay_account_id: 1,
            command_origin_conversation_id: Some(42),
            command_origin_account_id: Some(1),
            connected_identity: None,
        }
    }

    fn inbound(foreign_id: &str, self_sent: bool) -> InboundEvent {
        InboundEvent {
            foreign_id: ForeignMessageId(foreign_id.into()),
            sender: format!("5585999990000{DIRECT_ADDRESS_SUFFIX}"),
            sender_display_name: Some("Alice".into()),
            timestamp: chrono::Utc::now(),
            content: EventContent::Text {
                body: "hello".into(),
            },
            is_self_sent: self_sent,
            is_group: false,
            quoted_foreign_id: None,
        }
    }

    async fn wait_for_state(worker: &Arc<Worker>, id: &str, state: ConnectionState) {
        for _ in 0..100 {
            {
                let sessions = worker.sessions.lock().await;
                if let Some(conn) = sessions.get(&SessionId(id.into()))
                    && conn.state() == state
                {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {id} never reached {state}");
    }

    #[tokio::test]
    async fn manage_connects_and_persists_on_open() {
        let server = helpdesk_stub().await;
        let (worker, network, _dir) = test_worker(&server.uri(), 10).await;

        manage(&worker, SessionId("7".into()), meta("7"), false).await;
        network.wait_for_connect("7").await;

        network.emit(
            "7",
            NetworkEvent::Opened {
                identity: "55@contact".into(),
            },
        );
        wait_for_state(&worker, "7", ConnectionState::Open).await;

        // Durable metadata now carries the connected identity (persisted
        // shortly after the transition).
        for _ in 0..100 {
            let row = session_store::get_session(&worker.db, "7").await.unwrap();
            if let Some(row) = row
                && row.connected_identity.as_deref() == Some("55@contact")
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("connected identity never persisted");
    }

    #[tokio::test]
    async fn inbound_event_lands_in_relay_queue() {
        let server = helpdesk_stub().await;
        let (worker, network, _dir) = test_worker(&server.uri(), 10).await;
        manage(&worker, SessionId("7".into()), meta("7"), false).await;
        network.wait_for_connect("7").await;
        network.emit(
            "7",
            NetworkEvent::Opened {
                identity: "55@contact".into(),
            },
        );
        wait_for_state(&worker, "7", ConnectionState::Open).await;

        network.emit("7", NetworkEvent::Message(inbound("3EB0AAA", false)));

        // Poll the queue until the event shows up.
        let mut entry = None;
        for _ in 0..100 {
            entry = queue::dequeue(&worker.db, RELAY_QUEUE).await.unwrap();
            if entry.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let entry = entry.expect("inbound event never enqueued");
        let job: RelayJob = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(job.session_id, SessionId("7".into()));
        assert_eq!(job.relay_target_id, 7);
        assert_eq!(job.event.foreign_id, ForeignMessageId("3EB0AAA".into()));
    }

    #[tokio::test]
    async fn send_outbound_requires_open_session() {
        let server = helpdesk_stub().await;
        let (worker, _network, _dir) = test_worker(&server.uri(), 10).await;
        manage(&worker, SessionId("7".into()), meta("7"), false).await;

        let instruction = OutboundInstruction {
            session_id: SessionId("7".into()),
            recipient: "+55 85 99999-0000".into(),
            content: Some("hi".into()),
            helpdesk_message_id: HelpdeskMessageId(991),
            attachment: None,
            quote: None,
        };
        let err = send_outbound(&worker, instruction).await.unwrap_err();
        assert!(matches!(err, PontoonError::SessionNotReady { .. }));
    }

    #[tokio::test]
    async fn outbound_echo_is_suppressed_exactly_once() {
        let server = helpdesk_stub().await;
        let (worker, network, _dir) = test_worker(&server.uri(), 10).await;
        manage(&worker, SessionId("7".into()), meta("7"), false).await;
        network.wait_for_connect("7").await;
        network.emit(
            "7",
            NetworkEvent::Opened {
                identity: "55@contact".into(),
            },
        );
        wait_for_state(&worker, "7", ConnectionState::Open).await;

        let instruction = OutboundInstruction {
            session_id: SessionId("7".into()),
            recipient: "5585999990000".into(),
            content: Some("hi".into()),
            helpdesk_message_id: HelpdeskMessageId(991),
            attachment: None,
            quote: None,
        };
        let sent_id = send_outbound(&worker, instruction).await.unwrap();

        // The network echoes our own message back; it must not re-enter
        // the relay queue.
        let mut echo = inbound(&sent_id.0, true);
        echo.content = EventContent::Text { body: "hi".into() };
        handle_inbound_event(&worker, &SessionId("7".into()), echo.clone()).await;
        assert!(queue::dequeue(&worker.db, RELAY_QUEUE).await.unwrap().is_none());

        // A second observation of the same id is no longer an echo: it is
        // a genuine self-sent event (e.g. sent from another device).
        handle_inbound_event(&worker, &SessionId("7".into()), echo).await;
        assert!(queue::dequeue(&worker.db, RELAY_QUEUE).await.unwrap().is_some());

        // The transmitted frame carried the pre-generated id.
        let frames = network.transmitted();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1.message_id, sent_id);

        // And the mapping for reply threading was recorded.
        assert_eq!(
            correlation::get(&worker.db, &sent_id.0).await.unwrap(),
            Some(HelpdeskMessageId(991))
        );
    }

    #[tokio::test]
    async fn terminal_close_purges_credentials_and_identity() {
        let server = helpdesk_stub().await;
        let (worker, network, _dir) = test_worker(&server.uri(), 10).await;
        manage(&worker, SessionId("7".into()), meta("7"), false).await;
        network.wait_for_connect("7").await;
        network.emit(
            "7",
            NetworkEvent::Opened {
                identity: "55@contact".into(),
            },
        );
        wait_for_state(&worker, "7", ConnectionState::Open).await;

        network.emit(
            "7",
            NetworkEvent::Closed {
                reason: CloseReason::LoggedOut,
                detail: "logged out from phone".into(),
            },
        );
        wait_for_state(&worker, "7", ConnectionState::Disconnected).await;

        for _ in 0..100 {
            let purged = network.purged().contains(&SessionId("7".into()));
            let row = session_store::get_session(&worker.db, "7").await.unwrap();
            if purged && row.is_some_and(|r| r.connected_identity.is_none()) {
                // No reconnect follows a terminal closure.
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(network.connect_count("7"), 1);
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("credentials never purged or identity never cleared");
    }

    #[tokio::test]
    async fn failed_health_probe_forces_reconnect_path() {
        let server = helpdesk_stub().await;
        let (worker, network, _dir) = test_worker(&server.uri(), 20).await;
        manage(&worker, SessionId("3".into()), meta("3"), false).await;
        network.wait_for_connect("3").await;
        network.emit(
            "3",
            NetworkEvent::Opened {
                identity: "55@contact".into(),
            },
        );
        wait_for_state(&worker, "3", ConnectionState::Open).await;

        network.fail_probes(true);
        run_health_checks(&worker).await;

        {
            let sessions = worker.sessions.lock().await;
            let conn = sessions.get(&SessionId("3".into())).unwrap();
            assert_eq!(conn.last_error(), Some("health check failed"));
            assert_eq!(conn.reconnect_attempts(), 1);
        }

        // The scheduled reconnect fires and a second connect attempt lands.
        for _ in 0..100 {
            if network.connect_count("3") >= 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reconnect never attempted");
    }

    #[test]
    fn recipient_normalization_rules() {
        assert_eq!(
            normalize_recipient("5585999990000").unwrap(),
            format!("5585999990000{DIRECT_ADDRESS_SUFFIX}")
        );
        assert_eq!(
            normalize_recipient(" +5585999990000 ").unwrap(),
            format!("5585999990000{DIRECT_ADDRESS_SUFFIX}")
        );
        // Full addresses pass through untouched.
        let group = format!("12036304{GROUP_ADDRESS_SUFFIX}");
        assert_eq!(normalize_recipient(&group).unwrap(), group);
        assert!(normalize_recipient("not-a-number").is_err());
        assert!(normalize_recipient("").is_err());
    }
}