// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session -> worker assignment table.
//!
//! Sticky: a session never migrates while its owner lives, so two workers
//! can never hold the same live connection. Fresh assignments round-robin
//! over the live workers in a fixed order, which makes startup
//! reassignment deterministic for identical inputs.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use pontoon_core::{SessionId, SessionMetadata, WorkerId};

/// Primary-side record of who owns a session.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub worker_id: WorkerId,
    pub last_known_metadata: SessionMetadata,
}

#[derive(Default)]
pub struct AssignmentTable {
    map: DashMap<SessionId, Assignment>,
    next_index: AtomicUsize,
}

impl AssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current owner, if any is recorded (alive or not; liveness is
    /// the caller's to check).
    pub fn current_owner(&self, session_id: &SessionId) -> Option<WorkerId> {
        self.map.get(session_id).map(|a| a.worker_id)
    }

    pub fn metadata(&self, session_id: &SessionId) -> Option<SessionMetadata> {
        self.map.get(session_id).map(|a| a.last_known_metadata.clone())
    }

    /// Resolve the worker for a session: the recorded owner if it is still
    /// live, otherwise the next worker by round-robin. The assignment is
    /// recorded before the caller dispatches anything.
    pub fn assign_sticky(
        &self,
        session_id: &SessionId,
        metadata: &SessionMetadata,
        live_workers: &[WorkerId],
    ) -> Option<WorkerId> {
        if let Some(current) = self.current_owner(session_id)
            && live_workers.contains(&current)
        {
            // Refresh the metadata snapshot, keep the owner.
            self.map.insert(
                session_id.clone(),
                Assignment {
                    worker_id: current,
                    last_known_metadata: metadata.clone(),
                },
            );
            return Some(current);
        }

        if live_workers.is_empty() {
            return None;
        }
        let index = self.next_index.fetch_add(1, Ordering::SeqCst) % live_workers.len();
        let chosen = live_workers[index];
        self.map.insert(
            session_id.clone(),
            Assignment {
                worker_id: chosen,
                last_known_metadata: metadata.clone(),
            },
        );
        Some(chosen)
    }

    /// Atomically drop every assignment owned by a dead worker, returning
    /// the sessions that just became unowned.
    pub fn purge_worker(&self, worker_id: WorkerId) -> Vec<SessionId> {
        let mut purged = Vec::new();
        self.map.retain(|session_id, assignment| {
            if assignment.worker_id == worker_id {
                purged.push(session_id.clone());
                false
            } else {
                true
            }
        });
        purged
    }

    /// Drop a single assignment (e.g. dispatch to it just failed).
    pub fn remove(&self, session_id: &SessionId) {
        self.map.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> SessionMetadata {
        SessionMetadata {
            session_id: SessionId(id.into()),
            display_name: format!("Inbox {id}"),
            relay_target_id: 7,
            relay_account_id: 1,
            command_origin_conversation_id: None,
            command_origin_account_id: None,
            connected_identity: None,
        }
    }

    #[test]
    fn round_robin_over_live_workers() {
        let table = AssignmentTable::new();
        let live = [WorkerId(1), WorkerId(2)];

        let owners: Vec<WorkerId> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| {
                table
                    .assign_sticky(&SessionId((*id).into()), &meta(id), &live)
                    .unwrap()
            })
            .collect();
        assert_eq!(
            owners,
            vec![WorkerId(1), WorkerId(2), WorkerId(1), WorkerId(2)]
        );
    }

    #[test]
    fn assignment_is_sticky_while_owner_lives() {
        let table = AssignmentTable::new();
        let live = [WorkerId(1), WorkerId(2)];
        let sid = SessionId("a".into());

        let first = table.assign_sticky(&sid, &meta("a"), &live).unwrap();
        for _ in 0..5 {
            assert_eq!(table.assign_sticky(&sid, &meta("a"), &live), Some(first));
        }
    }

    #[test]
    fn dead_owner_triggers_fresh_round_robin() {
        let table = AssignmentTable::new();
        let sid = SessionId("a".into());

        let owner = table
            .assign_sticky(&sid, &meta("a"), &[WorkerId(1), WorkerId(2)])
            .unwrap();
        assert_eq!(owner, WorkerId(1));

        // Worker 1 died; only worker 2 remains live.
        let reassigned = table
            .assign_sticky(&sid, &meta("a"), &[WorkerId(2)])
            .unwrap();
        assert_eq!(reassigned, WorkerId(2));
    }

    #[test]
    fn no_live_workers_yields_none() {
        let table = AssignmentTable::new();
        assert_eq!(
            table.assign_sticky(&SessionId("a".into()), &meta("a"), &[]),
            None
        );
        assert!(table.is_empty());
    }

    #[test]
    fn purge_removes_exactly_the_dead_workers_sessions() {
        let table = AssignmentTable::new();
        let live = [WorkerId(1), WorkerId(2)];
        for id in ["a", "b", "c", "d"] {
            table.assign_sticky(&SessionId(id.into()), &meta(id), &live);
        }

        // a,c went to worker 1; b,d to worker 2.
        let mut purged = table.purge_worker(WorkerId(1));
        purged.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(purged, vec![SessionId("a".into()), SessionId("c".into())]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.current_owner(&SessionId("b".into())), Some(WorkerId(2)));
        assert_eq!(table.current_owner(&SessionId("a".into())), None);
    }

    #[test]
    fn round_robin_is_deterministic_for_identical_inputs() {
        let run = || {
            let table = AssignmentTable::new();
            let live = [WorkerId(1), WorkerId(2), WorkerId(3)];
            ["s1", "s2", "s3", "s4", "s5"]
                .iter()
                .map(|id| {
                    table
                        .assign_sticky(&SessionId((*id).into()), &meta(id), &live)
                        .unwrap()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
