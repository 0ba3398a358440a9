// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker process main loop.
//!
//! Control messages arrive on stdin; worker-to-primary messages drain to
//! stdout; logging is on stderr so the protocol stream stays clean. The
//! process ends when the primary closes the pipe.

use std::sync::Arc;
use std::time::Duration;

use pontoon_core::PontoonError;
use pontoon_ipc::{codec, ControlMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{http, sessions, Worker};

/// Run the worker until the control channel closes.
pub async fn run(
    worker: Arc<Worker>,
    outbox_rx: mpsc::Receiver<ControlMessage>,
) -> Result<(), PontoonError> {
    tokio::spawn(outbox_loop(outbox_rx));

    let port = worker.config.server.http_port + worker.id.0 as u16;
    {
        let worker = worker.clone();
        tokio::spawn(async move {
            if let Err(e) = http::serve(worker, port).await {
                error!(error = %e, "worker control surface failed");
            }
        });
    }

    {
        let worker = worker.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(
                worker.config.network.health_check_interval_secs,
            ));
            // Skip the immediate first tick: nothing is open yet.
            interval.tick().await;
            loop {
                interval.tick().await;
                sessions::run_health_checks(&worker).await;
            }
        });
    }

    info!(worker_id = %worker.id, "worker ready, awaiting instructions");
    control_loop(worker).await
}

async fn outbox_loop(mut rx: mpsc::Receiver<ControlMessage>) {
    let mut stdout = tokio::io::stdout();
    while let Some(msg) = rx.recv().await {
        if let Err(e) = codec::write_message(&mut stdout, &msg).await {
            error!(error = %e, "failed to write to primary, message lost");
        }
    }
}

async fn control_loop(worker: Arc<Worker>) -> Result<(), PontoonError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| PontoonError::Ipc(format!("control channel read failed: {e}")))?;
        let Some(line) = line else {
            // EOF: the primary is gone; supervised restart handles the rest.
            info!(worker_id = %worker.id, "control channel closed, shutting down");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        match codec::decode(&line) {
            Ok(msg) => dispatch_control(&worker, msg).await,
            Err(e) => warn!(error = %e, "malformed control message skipped"),
        }
    }
}

/// Execute one control message addressed to this worker.
pub async fn dispatch_control(worker: &Arc<Worker>, msg: ControlMessage) {
    match msg {
        ControlMessage::AssignSession {
            session_id,
            metadata,
        } => {
            sessions::manage(worker, session_id, metadata, false).await;
        }
        ControlMessage::ResumeSession {
            session_id,
            metadata,
        } => {
            sessions::manage(worker, session_id, metadata, true).await;
        }
        ControlMessage::StatusRequest { request_id } => {
            let reports = sessions::status_reports(worker).await;
            info!(
                worker_id = %worker.id,
                request_id = %request_id,
                sessions = reports.len(),
                "status requested"
            );
            worker
                .send_to_primary(ControlMessage::StatusResponse {
                    request_id,
                    worker_id: worker.id,
                    sessions: reports,
                })
                .await;
        }
        ControlMessage::SendOutboundMessage { instruction } => {
            let session_id = instruction.session_id.clone();
            if let Err(e) = sessions::send_outbound(worker, instruction).await {
                // Outbound retry policy belongs to the caller; this side
                // only reports.
                warn!(session_id = %session_id, error = %e, "outbound send failed");
            }
        }
        ControlMessage::RequestAssign { session_id, .. } => {
            warn!(session_id = %session_id, "primary-bound message arrived at worker, ignored");
        }
        ControlMessage::StatusResponse { request_id, .. } => {
            warn!(request_id = %request_id, "primary-bound message arrived at worker, ignored");
        }
        ControlMessage::Unknown => {
            warn!(worker_id = %worker.id, "unknown control message ignored");
        }
    }
}
