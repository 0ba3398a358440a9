// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing challenge rendering.
//!
//! Challenges arrive from the protocol layer as an opaque payload string
//! and are delivered to the operator's conversation as a scannable unicode
//! QR block.

use pontoon_core::PontoonError;
use qrcode::render::unicode;
use qrcode::{EcLevel, QrCode};

/// Render a pairing payload as a unicode QR block.
pub fn render_challenge(payload: &str) -> Result<String, PontoonError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::L)
        .map_err(|e| PontoonError::Internal(format!("pairing payload not encodable: {e}")))?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}

/// Generate a locally-unique outbound message id.
///
/// Registered with the echo guard before transmission; the format mirrors
/// what the network itself assigns (16 uppercase hex-ish characters) so
/// echo comparison is uniform.
pub fn generate_outbound_id() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .to_uppercase()
        .chars()
        .take(16)
        .collect()
}
