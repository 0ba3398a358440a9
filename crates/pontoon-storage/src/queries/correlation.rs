// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation store: foreign message id -> helpdesk message id, with TTL.
//!
//! Best-effort cache, not a source of truth. A miss (absent or expired)
//! means "relay without thread linkage", never an error. Writes are
//! idempotent upserts so at-least-once job redelivery cannot corrupt it.

use pontoon_core::{HelpdeskMessageId, PontoonError};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Record a mapping with the given lifetime. Re-writing the same key
/// refreshes both the value and the expiry.
pub async fn put(
    db: &Database,
    foreign_id: &str,
    helpdesk_id: HelpdeskMessageId,
    ttl_secs: u64,
) -> Result<(), PontoonError> {
    let foreign_id = foreign_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO correlation (foreign_id, helpdesk_id, expires_at)
                     VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+{ttl_secs} seconds'))
                     ON CONFLICT(foreign_id) DO UPDATE SET
                         helpdesk_id = excluded.helpdesk_id,
                         expires_at = excluded.expires_at"
                ),
                params![foreign_id, helpdesk_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up the helpdesk id for a foreign id.
///
/// Returns `None` when the key is absent or expired; an expired row is
/// removed on the way out rather than waiting for the sweep.
pub async fn get(
    db: &Database,
    foreign_id: &str,
) -> Result<Option<HelpdeskMessageId>, PontoonError> {
    let foreign_id = foreign_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT helpdesk_id, expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 FROM correlation WHERE foreign_id = ?1",
                params![foreign_id.clone()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?)),
            );
            match result {
                Ok((_, true)) => {
                    conn.execute(
                        "DELETE FROM correlation WHERE foreign_id = ?1",
                        params![foreign_id],
                    )?;
                    Ok(None)
                }
                Ok((helpdesk_id, false)) => Ok(Some(HelpdeskMessageId(helpdesk_id))),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Remove every expired mapping. Returns how many rows went away.
pub async fn purge_expired(db: &Database) -> Result<usize, PontoonError> {
    db.connection()
        .call(|conn| {
            let purged = conn.execute(
                "DELETE FROM correlation
                 WHERE expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )?;
            Ok(purged)
        })
        .await
        .map_err(map_tr_err)
}
