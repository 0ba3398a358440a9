// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable mock of the messaging-network collaborator.
//!
//! Tests drive sessions by emitting [`NetworkEvent`]s onto the stream a
//! worker obtained from `connect`, and observe every call the worker makes
//! (connects, transmits, logouts, credential purges).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use pontoon_core::{
    ForeignMessageId, NetworkClient, NetworkEvent, OutboundFrame, PontoonError, SessionId,
};
use tokio::sync::mpsc;

/// Mock network client with call capture and event injection.
#[derive(Default)]
pub struct MockNetwork {
    streams: DashMap<String, mpsc::Sender<NetworkEvent>>,
    connect_counts: DashMap<String, usize>,
    transmitted: Mutex<Vec<(SessionId, OutboundFrame)>>,
    logouts: Mutex<Vec<SessionId>>,
    purges: Mutex<Vec<SessionId>>,
    fail_probe: AtomicBool,
    fail_transmit: AtomicBool,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event onto a session's live stream. Returns `false` when no
    /// stream is connected (or the receiver was dropped).
    pub fn emit(&self, session_id: &str, event: NetworkEvent) -> bool {
        match self.streams.get(session_id) {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Wait (bounded) until the worker has called `connect` for a session.
    pub async fn wait_for_connect(&self, session_id: &str) {
        for _ in 0..200 {
            if self.streams.contains_key(session_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {session_id} was never connected");
    }

    pub fn connect_count(&self, session_id: &str) -> usize {
        self.connect_counts
            .get(session_id)
            .map(|c| *c)
            .unwrap_or(0)
    }

    pub fn transmitted(&self) -> Vec<(SessionId, OutboundFrame)> {
        self.transmitted.lock().unwrap().clone()
    }

    pub fn logouts(&self) -> Vec<SessionId> {
        self.logouts.lock().unwrap().clone()
    }

    pub fn purged(&self) -> Vec<SessionId> {
        self.purges.lock().unwrap().clone()
    }

    /// Make every subsequent liveness probe fail.
    pub fn fail_probes(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent transmit fail.
    pub fn fail_transmits(&self, fail: bool) {
        self.fail_transmit.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkClient for MockNetwork {
    async fn connect(
        &self,
        session_id: &SessionId,
    ) -> Result<mpsc::Receiver<NetworkEvent>, PontoonError> {
        let (tx, rx) = mpsc::channel(64);
        self.streams.insert(session_id.0.clone(), tx);
        *self
            .connect_counts
            .entry(session_id.0.clone())
            .or_insert(0) += 1;
        Ok(rx)
    }

    async fn transmit(
        &self,
        session_id: &SessionId,
        frame: OutboundFrame,
    ) -> Result<ForeignMessageId, PontoonError> {
        if self.fail_transmit.load(Ordering::SeqCst) {
            return Err(PontoonError::network("transmit failed (scripted)"));
        }
        let id = frame.message_id.clone();
        self.transmitted
            .lock()
            .unwrap()
            .push((session_id.clone(), frame));
        Ok(id)
    }

    async fn logout(&self, session_id: &SessionId) -> Result<(), PontoonError> {
        self.logouts.lock().unwrap().push(session_id.clone());
        // A logout tears the stream down.
        self.streams.remove(&session_id.0);
        Ok(())
    }

    async fn probe(&self, session_id: &SessionId) -> Result<(), PontoonError> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(PontoonError::network(format!(
                "probe failed for {session_id} (scripted)"
            )));
        }
        Ok(())
    }

    async fn purge_credentials(&self, session_id: &SessionId) -> Result<(), PontoonError> {
        self.purges.lock().unwrap().push(session_id.clone());
        Ok(())
    }
}
