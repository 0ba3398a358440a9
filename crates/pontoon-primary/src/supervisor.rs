// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker process supervision.
//!
//! The primary spawns each worker as a child running `pontoon worker`,
//! holding its stdin for control messages and reading its stdout for
//! worker-to-primary traffic. A worker's exit is a first-class event: the
//! pool reports it so assignments are purged atomically, and abnormal
//! exits get a replacement worker.

use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use pontoon_core::{PontoonError, WorkerId};
use pontoon_ipc::{codec, ControlMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Events the supervisor surfaces to the primary's event loop.
#[derive(Debug)]
pub enum PrimaryEvent {
    FromWorker {
        worker_id: WorkerId,
        message: ControlMessage,
    },
    WorkerExited {
        worker_id: WorkerId,
        code: Option<i32>,
    },
}

struct WorkerHandle {
    stdin_tx: mpsc::Sender<ControlMessage>,
}

/// The set of live workers and their control-channel ends.
pub struct WorkerPool {
    workers: DashMap<u32, WorkerHandle>,
    events_tx: mpsc::Sender<PrimaryEvent>,
    next_worker_id: AtomicU32,
}

impl WorkerPool {
    pub fn new(events_tx: mpsc::Sender<PrimaryEvent>) -> Self {
        Self {
            workers: DashMap::new(),
            events_tx,
            next_worker_id: AtomicU32::new(1),
        }
    }

    /// Spawn one worker child process and wire up its pipes.
    pub async fn spawn_worker(&self) -> Result<WorkerId, PontoonError> {
        let worker_id = WorkerId(self.next_worker_id.fetch_add(1, Ordering::SeqCst));
        let exe = std::env::current_exe()
            .map_err(|e| PontoonError::Internal(format!("cannot locate own binary: {e}")))?;

        let mut child = Command::new(exe)
            .arg("worker")
            .arg("--id")
            .arg(worker_id.0.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| PontoonError::Internal(format!("failed to spawn worker: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PontoonError::Internal("worker stdin not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PontoonError::Internal("worker stdout not piped".into()))?;

        // Writer: drain control messages into the child's stdin.
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<ControlMessage>(64);
        tokio::spawn(async move {
            while let Some(msg) = stdin_rx.recv().await {
                if let Err(e) = codec::write_message(&mut stdin, &msg).await {
                    error!(error = %e, "control write to worker failed");
                    break;
                }
            }
        });

        // Reader: surface worker stdout lines as primary events.
        {
            let events_tx = self.events_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match codec::decode(&line) {
                        Ok(message) => {
                            if events_tx
                                .send(PrimaryEvent::FromWorker { worker_id, message })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                        Err(e) => warn!(worker_id = %worker_id, error = %e,
                                        "malformed worker message skipped"),
                    }
                }
            });
        }

        // Exit watcher: a dead worker is an event, not an error.
        {
            let events_tx = self.events_tx.clone();
            tokio::spawn(async move {
                let code = match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        error!(worker_id = %worker_id, error = %e, "worker wait failed");
                        None
                    }
                };
                let _ = events_tx
                    .send(PrimaryEvent::WorkerExited { worker_id, code })
                    .await;
            });
        }

        self.workers.insert(worker_id.0, WorkerHandle { stdin_tx });
        info!(worker_id = %worker_id, "worker spawned");
        Ok(worker_id)
    }

    /// Register a pre-wired worker handle. Test seam: lets the control
    /// plane run against channel-backed workers instead of processes.
    pub fn register_handle(
        &self,
        worker_id: WorkerId,
        stdin_tx: mpsc::Sender<ControlMessage>,
    ) {
        self.workers.insert(worker_id.0, WorkerHandle { stdin_tx });
    }

    /// Live worker ids in a fixed (ascending) order, so round-robin walks
    /// the same sequence given the same pool.
    pub fn live_workers(&self) -> Vec<WorkerId> {
        let mut ids: Vec<u32> = self.workers.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids.into_iter().map(WorkerId).collect()
    }

    pub fn is_live(&self, worker_id: WorkerId) -> bool {
        self.workers.contains_key(&worker_id.0)
    }

    /// Send a control message to one worker.
    pub async fn send(
        &self,
        worker_id: WorkerId,
        msg: ControlMessage,
    ) -> Result<(), PontoonError> {
        let tx = self
            .workers
            .get(&worker_id.0)
            .map(|h| h.stdin_tx.clone())
            .ok_or_else(|| {
                PontoonError::Ipc(format!("worker {worker_id} is not in the pool"))
            })?;
        tx.send(msg)
            .await
            .map_err(|_| PontoonError::Ipc(format!("worker {worker_id} control channel closed")))
    }

    /// Forget a worker (its process already exited).
    pub fn remove(&self, worker_id: WorkerId) {
        self.workers.remove(&worker_id.0);
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn live_workers_are_sorted() {
        let (tx, _rx) = mpsc::channel(8);
        let pool = WorkerPool::new(tx);
        let (a, _ra) = mpsc::channel(8);
        let (b, _rb) = mpsc::channel(8);
        let (c, _rc) = mpsc::channel(8);
        pool.register_handle(WorkerId(3), c);
        pool.register_handle(WorkerId(1), a);
        pool.register_handle(WorkerId(2), b);

        assert_eq!(
            pool.live_workers(),
            vec![WorkerId(1), WorkerId(2), WorkerId(3)]
        );
    }

    #[tokio::test]
    async fn send_to_unknown_worker_errors() {
        let (tx, _rx) = mpsc::channel(8);
        let pool = WorkerPool::new(tx);
        let err = pool
            .send(
                WorkerId(9),
                ControlMessage::StatusRequest {
                    request_id: "r".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PontoonError::Ipc(_)));
    }

    #[tokio::test]
    async fn removed_worker_is_no_longer_live() {
        let (tx, _rx) = mpsc::channel(8);
        let pool = WorkerPool::new(tx);
        let (a, _ra) = mpsc::channel(8);
        pool.register_handle(WorkerId(1), a);
        assert!(pool.is_live(WorkerId(1)));

        pool.remove(WorkerId(1));
        assert!(!pool.is_live(WorkerId(1)));
        assert!(pool.is_empty());
    }
}
