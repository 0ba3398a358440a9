// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pontoon serve` - run the primary orchestrator.

use pontoon_config::PontoonConfig;
use pontoon_core::PontoonError;
use pontoon_primary::Primary;
use tracing::info;

pub async fn run(config: PontoonConfig) -> Result<(), PontoonError> {
    info!("starting pontoon primary");
    let (primary, events_rx) = Primary::new(config).await?;

    tokio::select! {
        result = pontoon_primary::run(primary, events_rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
