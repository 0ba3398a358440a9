// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Pontoon integration tests.
//!
//! Provides a scriptable [`MockNetwork`] so worker and end-to-end tests
//! run fast, deterministic, and CI-friendly without a real messaging
//! network.

pub mod mock_network;

pub use mock_network::MockNetwork;
