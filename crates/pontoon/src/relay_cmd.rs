// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pontoon relay` - run the relay queue consumer.

use pontoon_config::PontoonConfig;
use pontoon_core::PontoonError;
use pontoon_helpdesk::HelpdeskClient;
use pontoon_relay::RelayConsumer;
use pontoon_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run(config: PontoonConfig) -> Result<(), PontoonError> {
    info!("starting pontoon relay consumer");
    let db = Database::open(&config.storage.database_path).await?;
    let helpdesk = HelpdeskClient::new(&config.helpdesk)?;
    let consumer = RelayConsumer::new(db.clone(), helpdesk, &config);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            cancel.cancel();
        });
    }

    let result = consumer.run(cancel).await;
    db.close().await?;
    result
}
