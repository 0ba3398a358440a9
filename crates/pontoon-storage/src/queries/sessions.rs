// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable session metadata CRUD.
//!
//! Sessions are upserted on every state transition that changes their
//! relay targets or connected identity, and removed only by explicit
//! deauthorization.

use pontoon_core::{PontoonError, SessionMetadata};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::SessionRow;

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<SessionRow, rusqlite::Error> {
    Ok(SessionRow {
        session_id: row.get(0)?,
        display_name: row.get(1)?,
        relay_target_id: row.get(2)?,
        relay_account_id: row.get(3)?,
        command_origin_conversation_id: row.get(4)?,
        command_origin_account_id: row.get(5)?,
        connected_identity: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const SELECT_COLUMNS: &str = "session_id, display_name, relay_target_id, relay_account_id,
     command_origin_conversation_id, command_origin_account_id,
     connected_identity, created_at, updated_at";

/// Insert or update a session's durable metadata.
pub async fn upsert_session(db: &Database, meta: &SessionMetadata) -> Result<(), PontoonError> {
    let meta = meta.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (session_id, display_name, relay_target_id,
                     relay_account_id, command_origin_conversation_id,
                     command_origin_account_id, connected_identity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(session_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     relay_target_id = excluded.relay_target_id,
                     relay_account_id = excluded.relay_account_id,
                     command_origin_conversation_id = excluded.command_origin_conversation_id,
                     command_origin_account_id = excluded.command_origin_account_id,
                     connected_identity = excluded.connected_identity,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    meta.session_id.0,
                    meta.display_name,
                    meta.relay_target_id,
                    meta.relay_account_id,
                    meta.command_origin_conversation_id,
                    meta.command_origin_account_id,
                    meta.connected_identity,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by id.
pub async fn get_session(db: &Database, session_id: &str) -> Result<Option<SessionRow>, PontoonError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM sessions WHERE session_id = ?1"
            ))?;
            let result = stmt.query_row(params![session_id], row_to_session);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all persisted sessions, oldest first (stable ordering matters:
/// startup reassignment round-robins over this list).
pub async fn list_sessions(db: &Database) -> Result<Vec<SessionRow>, PontoonError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM sessions ORDER BY session_id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_session)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err)
}

/// Record the network-assigned identity once a session authenticates.
pub async fn update_connected_identity(
    db: &Database,
    session_id: &str,
    identity: Option<&str>,
) -> Result<(), PontoonError> {
    let session_id = session_id.to_string();
    let identity = identity.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET connected_identity = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE session_id = ?2",
                params![identity, session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a session. Only explicit deauthorization calls this.
pub async fn delete_session(db: &Database, session_id: &str) -> Result<bool, PontoonError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM sessions WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
