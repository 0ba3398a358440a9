// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary management surface.
//!
//! `GET /global-status` broadcasts a status request across the pool and
//! returns the merged view; unresponsive workers are reported as timed
//! out, never waited on past the configured timeout.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use pontoon_core::PontoonError;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{status, Primary};

pub fn router(primary: Arc<Primary>) -> Router {
    Router::new()
        .route("/global-status", get(get_global_status))
        .layer(CorsLayer::permissive())
        .with_state(primary)
}

/// Bind and serve the management surface.
pub async fn serve(primary: Arc<Primary>, port: u16) -> Result<(), PontoonError> {
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        PontoonError::Internal(format!("failed to bind management surface {addr}: {e}"))
    })?;
    info!(%addr, "primary management surface listening");

    axum::serve(listener, router(primary))
        .await
        .map_err(|e| PontoonError::Internal(format!("management surface error: {e}")))
}

async fn get_global_status(
    State(primary): State<Arc<Primary>>,
) -> Json<status::GlobalStatus> {
    let global = status::aggregate_status(&primary, primary.status_timeout()).await;
    Json(global)
}
