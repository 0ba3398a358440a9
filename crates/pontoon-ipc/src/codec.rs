// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON framing over the worker's stdin/stdout.
//!
//! Pipes give the protocol its "reliable, ordered, process-local" channel;
//! this module only handles framing. Worker logging goes to stderr so the
//! stdout stream stays pure protocol.

use pontoon_core::PontoonError;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::message::ControlMessage;

/// Encode one message as a single JSON line.
pub fn encode(msg: &ControlMessage) -> Result<String, PontoonError> {
    let mut line = serde_json::to_string(msg)
        .map_err(|e| PontoonError::Ipc(format!("encode failed: {e}")))?;
    line.push('\n');
    Ok(line)
}

/// Decode one line into a message. Unknown type tags decode to
/// [`ControlMessage::Unknown`]; only malformed JSON is an error.
pub fn decode(line: &str) -> Result<ControlMessage, PontoonError> {
    serde_json::from_str(line.trim())
        .map_err(|e| PontoonError::Ipc(format!("decode failed: {e}: {line:.120}")))
}

/// Write one framed message to the given transport end.
pub async fn write_message<W>(writer: &mut W, msg: &ControlMessage) -> Result<(), PontoonError>
where
    W: AsyncWrite + Unpin,
{
    let line = encode(msg)?;
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| PontoonError::Ipc(format!("write failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| PontoonError::Ipc(format!("flush failed: {e}")))?;
    Ok(())
}
