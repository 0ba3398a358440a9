// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local HTTP control surface for one worker.
//!
//! `GET /status` reports every owned session; `POST /webhook` ingests
//! helpdesk events (commands and agent messages).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use pontoon_core::PontoonError;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{sessions, webhook, Worker};

/// Build the worker router.
pub fn router(worker: Arc<Worker>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/webhook", post(webhook::handle_webhook))
        .layer(CorsLayer::permissive())
        .with_state(worker)
}

/// Bind and serve the worker's control surface.
pub async fn serve(worker: Arc<Worker>, port: u16) -> Result<(), PontoonError> {
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PontoonError::Internal(format!("failed to bind worker surface {addr}: {e}")))?;
    info!(worker_id = %worker.id, %addr, "worker control surface listening");

    axum::serve(listener, router(worker))
        .await
        .map_err(|e| PontoonError::Internal(format!("worker surface error: {e}")))
}

async fn get_status(State(worker): State<Arc<Worker>>) -> Json<serde_json::Value> {
    let reports = sessions::status_reports(&worker).await;
    Json(serde_json::json!({
        "message": format!("pontoon worker {} is running", worker.id),
        "server_time": chrono::Utc::now().to_rfc3339(),
        "active_sessions_on_worker": reports.len(),
        "sessions_on_worker": reports,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pontoon_core::{NetworkClient, SessionId, SessionMetadata, WorkerId};
    use pontoon_test_utils::MockNetwork;

    async fn test_worker() -> (Arc<Worker>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = pontoon_config::load_config_from_str("").unwrap();
        config.storage.database_path =
            dir.path().join("w.db").to_str().unwrap().to_string();
        config.helpdesk.access_token = Some("token".into());
        let network = Arc::new(MockNetwork::new());
        let (worker, _outbox) =
            Worker::new(WorkerId(2), config, network as Arc<dyn NetworkClient>)
                .await
                .unwrap();
        (worker, dir)
    }

    #[tokio::test]
    async fn status_endpoint_reports_owned_sessions() {
        let (worker, _dir) = test_worker().await;
        sessions::manage(
            &worker,
            SessionId("9".into()),
            SessionMetadata {
                session_id: SessionId("9".into()),
                display_name: "Inbox Nine".into(),
                relay_target_id: 9,
                relay_account_id: 1,
                command_origin_conversation_id: None,
                command_origin_account_id: None,
                connected_identity: None,
            },
            true,
        )
        .await;

        let Json(body) = get_status(State(worker)).await;
        assert_eq!(body["active_sessions_on_worker"], 1);
        assert_eq!(
            body["sessions_on_worker"][0]["display_name"],
            "Inbox Nine"
        );
        assert_eq!(body["sessions_on_worker"][0]["worker_id"], 2);
    }
}
