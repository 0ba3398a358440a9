// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the boundaries of the core.

pub mod network;

pub use network::{
    CloseReason, EventContent, InboundEvent, MediaKind, NetworkClient, NetworkEvent,
    OutboundContent, OutboundFrame, QuoteRef,
};
