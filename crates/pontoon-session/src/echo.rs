// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Echo suppression for operator-originated sends.
//!
//! An outbound id is registered here immediately before transmission,
//! closing the race against the event loop observing the network's echo of
//! the same message. Observing the id removes the entry (suppress exactly
//! once); unobserved entries lapse after a fixed timeout.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// How long an unobserved entry stays armed.
pub const ECHO_GUARD_TTL: Duration = Duration::from_secs(60);

/// Ephemeral set of outbound ids whose echo is still expected.
pub struct EchoGuard {
    ttl: Duration,
    entries: DashMap<String, Instant>,
}

impl Default for EchoGuard {
    fn default() -> Self {
        Self::new(ECHO_GUARD_TTL)
    }
}

impl EchoGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Arm the guard for an outbound id. Must happen before transmission.
    pub fn register(&self, outbound_id: &str) {
        self.entries
            .insert(outbound_id.to_string(), Instant::now());
    }

    /// Check whether an observed inbound id is our own echo.
    ///
    /// A hit consumes the entry, so the same id suppresses exactly once;
    /// an entry older than the TTL no longer counts.
    pub fn suppress(&self, observed_id: &str) -> bool {
        match self.entries.remove(observed_id) {
            Some((_, armed_at)) => armed_at.elapsed() < self.ttl,
            None => false,
        }
    }

    /// Drop entries that outlived the TTL without being observed.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, armed_at| armed_at.elapsed() < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_id_suppresses_exactly_once() {
        let guard = EchoGuard::default();
        guard.register("3EB0ABCDEF");

        assert!(guard.suppress("3EB0ABCDEF"));
        // Second observation of the same id is not an echo anymore.
        assert!(!guard.suppress("3EB0ABCDEF"));
        assert!(guard.is_empty());
    }

    #[test]
    fn unregistered_id_is_not_an_echo() {
        let guard = EchoGuard::default();
        assert!(!guard.suppress("NEVER-SENT"));
    }

    #[test]
    fn expired_entry_no_longer_suppresses() {
        let guard = EchoGuard::new(Duration::from_millis(0));
        guard.register("STALE");
        std::thread::sleep(Duration::from_millis(5));
        assert!(!guard.suppress("STALE"));
    }

    #[test]
    fn sweep_reaps_only_expired_entries() {
        let guard = EchoGuard::new(Duration::from_millis(30));
        guard.register("old");
        std::thread::sleep(Duration::from_millis(40));
        guard.register("fresh");

        assert_eq!(guard.sweep(), 1);
        assert_eq!(guard.len(), 1);
        assert!(guard.suppress("fresh"));
    }
}
