// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pontoon status` - print the cluster-wide session status.

use pontoon_config::PontoonConfig;
use pontoon_core::PontoonError;
use pontoon_primary::PRIMARY_PORT_OFFSET;

pub async fn run(config: PontoonConfig) -> Result<(), PontoonError> {
    let port = config.server.http_port + PRIMARY_PORT_OFFSET;
    let url = format!("http://127.0.0.1:{port}/global-status");

    let response = reqwest::get(&url)
        .await
        .map_err(|e| PontoonError::Internal(format!("is the primary running? {e}")))?;
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| PontoonError::Internal(format!("unexpected status payload: {e}")))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&body)
            .map_err(|e| PontoonError::Internal(e.to_string()))?
    );
    Ok(())
}
