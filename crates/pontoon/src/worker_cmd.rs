// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pontoon worker` - run one session worker (spawned by the primary).

use std::sync::Arc;

use pontoon_config::PontoonConfig;
use pontoon_core::{NetworkClient, PontoonError, WorkerId};
use pontoon_worker::Worker;
use tracing::info;

pub async fn run(config: PontoonConfig, id: u32) -> Result<(), PontoonError> {
    info!(worker_id = id, "starting pontoon worker");
    let network = build_network();
    let (worker, outbox_rx) = Worker::new(WorkerId(id), config, network).await?;
    pontoon_worker::runtime::run(worker, outbox_rx).await
}

#[cfg(feature = "sim-network")]
fn build_network() -> Arc<dyn NetworkClient> {
    Arc::new(crate::net::SimNetwork::new())
}

#[cfg(not(feature = "sim-network"))]
compile_error!(
    "pontoon requires a messaging-network adapter; build with the sim-network \
     feature or link a protocol adapter crate"
);
