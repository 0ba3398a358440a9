// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Simulated messaging network for development.
//!
//! The real protocol library is an external collaborator behind
//! [`NetworkClient`]; this stand-in lets the whole bridge run end to end
//! without it. A connected session issues one pairing challenge, opens a
//! few seconds later, and echoes every transmitted message back as a
//! self-sent inbound event - enough to exercise pairing delivery, echo
//! suppression, and relay flow from the command line.

#![cfg(feature = "sim-network")]

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use pontoon_core::traits::network::DIRECT_ADDRESS_SUFFIX;
use pontoon_core::{
    EventContent, ForeignMessageId, InboundEvent, NetworkClient, NetworkEvent, OutboundContent,
    OutboundFrame, PontoonError, SessionId,
};
use tokio::sync::mpsc;

const PAIRING_DELAY: Duration = Duration::from_millis(500);
const OPEN_DELAY: Duration = Duration::from_secs(3);

pub struct SimNetwork {
    streams: DashMap<String, mpsc::Sender<NetworkEvent>>,
}

impl SimNetwork {
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
        }
    }
}

#[async_trait]
impl NetworkClient for SimNetwork {
    async fn connect(
        &self,
        session_id: &SessionId,
    ) -> Result<mpsc::Receiver<NetworkEvent>, PontoonError> {
        let (tx, rx) = mpsc::channel(64);
        self.streams.insert(session_id.0.clone(), tx.clone());

        let session = session_id.0.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PAIRING_DELAY).await;
            let challenge = format!("sim-pairing-{}", uuid::Uuid::new_v4());
            if tx
                .send(NetworkEvent::PairingChallenge { payload: challenge })
                .await
                .is_err()
            {
                return;
            }

            tokio::time::sleep(OPEN_DELAY).await;
            let _ = tx
                .send(NetworkEvent::Opened {
                    identity: format!("sim-{session}{DIRECT_ADDRESS_SUFFIX}"),
                })
                .await;
        });

        Ok(rx)
    }

    async fn transmit(
        &self,
        session_id: &SessionId,
        frame: OutboundFrame,
    ) -> Result<ForeignMessageId, PontoonError> {
        let tx = self
            .streams
            .get(&session_id.0)
            .map(|t| t.clone())
            .ok_or_else(|| PontoonError::network("simulated session has no stream"))?;

        // Echo the send back as a self-sent event, the way the real
        // network confirms deliveries.
        let body = match &frame.content {
            OutboundContent::Text { body } => body.clone(),
            OutboundContent::Media { caption, .. } => {
                caption.clone().unwrap_or_else(|| "[media]".to_string())
            }
        };
        let echo = NetworkEvent::Message(InboundEvent {
            foreign_id: frame.message_id.clone(),
            sender: frame.target.clone(),
            sender_display_name: None,
            timestamp: chrono::Utc::now(),
            content: EventContent::Text { body },
            is_self_sent: true,
            is_group: false,
            quoted_foreign_id: frame.quote.as_ref().map(|q| q.foreign_id.clone()),
        });
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(echo).await;
        });

        Ok(frame.message_id)
    }

    async fn logout(&self, session_id: &SessionId) -> Result<(), PontoonError> {
        self.streams.remove(&session_id.0);
        Ok(())
    }

    async fn probe(&self, session_id: &SessionId) -> Result<(), PontoonError> {
        if self.streams.contains_key(&session_id.0) {
            Ok(())
        } else {
            Err(PontoonError::network("simulated session is gone"))
        }
    }

    async fn purge_credentials(&self, _session_id: &SessionId) -> Result<(), PontoonError> {
        Ok(())
    }
}
