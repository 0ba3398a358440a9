// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash-safe relay queue operations.
//!
//! At-least-once delivery: `dequeue` locks an entry as "processing" with a
//! lock timeout, so a consumer crash returns the entry to circulation via
//! `reap_expired_locks` rather than losing it. Exhausted entries are parked
//! as "failed" for manual inspection, never deleted.

use pontoon_core::PontoonError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::QueueEntry;

/// Lock horizon for entries handed to a consumer.
const PROCESSING_LOCK_MINUTES: u32 = 5;

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        payload: row.get(2)?,
        status: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        locked_until: row.get(8)?,
        next_attempt_at: row.get(9)?,
    })
}

const SELECT_COLUMNS: &str = "id, queue_name, payload, status, attempts, max_attempts,
     created_at, updated_at, locked_until, next_attempt_at";

/// Enqueue a new item. Returns the auto-generated queue entry ID.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    max_attempts: u32,
) -> Result<i64, PontoonError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO relay_queue (queue_name, payload, max_attempts)
                 VALUES (?1, ?2, ?3)",
                params![queue_name, payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Dequeue the next deliverable entry from the named queue.
///
/// Atomically selects the oldest pending entry whose backoff window has
/// elapsed and marks it "processing" with a lock timeout. Returns `None`
/// if nothing is deliverable right now.
pub async fn dequeue(db: &Database, queue_name: &str) -> Result<Option<QueueEntry>, PontoonError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SELECT_COLUMNS}
                     FROM relay_queue
                     WHERE queue_name = ?1 AND status = 'pending'
                       AND (next_attempt_at IS NULL
                            OR next_attempt_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY id ASC
                     LIMIT 1"
                ))?;
                stmt.query_row(params![queue_name], row_to_entry)
            };

            match result {
                Ok(entry) => {
                    tx.execute(
                        &format!(
                            "UPDATE relay_queue SET status = 'processing',
                             locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+{PROCESSING_LOCK_MINUTES} minutes'),
                             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                             WHERE id = ?1"
                        ),
                        params![entry.id],
                    )?;
                    tx.commit()?;

                    Ok(Some(QueueEntry {
                        status: "processing".to_string(),
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Acknowledge successful processing of a queue entry.
pub async fn ack(db: &Database, id: i64) -> Result<(), PontoonError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE relay_queue SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a queue entry as failed.
///
/// Increments attempts. At `max_attempts` the entry is parked as "failed";
/// otherwise it returns to "pending" with a backoff window before it
/// becomes deliverable again.
pub async fn fail(db: &Database, id: i64, backoff_ms: u64) -> Result<(), PontoonError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM relay_queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            if new_attempts >= max_attempts {
                conn.execute(
                    "UPDATE relay_queue SET status = 'failed', attempts = ?1,
                     locked_until = NULL, next_attempt_at = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![new_attempts, id],
                )?;
            } else {
                let backoff_secs = (backoff_ms as f64 / 1000.0).ceil() as i64;
                conn.execute(
                    &format!(
                        "UPDATE relay_queue SET status = 'pending', attempts = ?1,
                         locked_until = NULL,
                         next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+{backoff_secs} seconds'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?2"
                    ),
                    params![new_attempts, id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Return entries whose processing lock expired to "pending".
///
/// A consumer crash mid-delivery leaves its entry locked; this sweep is
/// what makes delivery at-least-once instead of at-most-once.
pub async fn reap_expired_locks(db: &Database, queue_name: &str) -> Result<usize, PontoonError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let reaped = conn.execute(
                "UPDATE relay_queue SET status = 'pending', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE queue_name = ?1 AND status = 'processing'
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![queue_name],
            )?;
            Ok(reaped)
        })
        .await
        .map_err(map_tr_err)
}
