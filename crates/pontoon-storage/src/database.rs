// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! One `Database` per process; all of a process's writes are serialized
//! through tokio-rusqlite's single background thread. Multiple processes
//! share the file through WAL mode plus a busy timeout, and only ever touch
//! single rows per statement, so no cross-process transaction coordination
//! is needed.

use std::path::Path;

use pontoon_core::PontoonError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the shared SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs and
    /// run any pending migrations.
    pub async fn open(path: &str) -> Result<Self, PontoonError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| PontoonError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
        })
        .await
        .map_err(map_tr_err)?;

        // The inner result carries migration failures, the outer one
        // transport failures from the connection thread.
        conn.call(|conn| Ok(migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Access the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), PontoonError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> PontoonError {
    PontoonError::Storage {
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/dir/test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn migrations_are_idempotent_across_opens() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db1 = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db1.close().await.unwrap();
        drop(db1);

        // Second open re-runs the migration runner against applied history.
        let db2 = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let count: i64 = db2
            .connection()
            .call(|conn| -> rusqlite::Result<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
        db2.close().await.unwrap();
    }
}
