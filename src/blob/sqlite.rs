//! Blob persistence using SQLite.

use super::BlobStore;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Blob store backed by a single SQLite table.
///
/// # Schema
/// ```sql
/// CREATE TABLE blobs (
///     key        TEXT PRIMARY KEY,
///     value      BLOB NOT NULL,
///     updated_at TEXT NOT NULL   -- ISO 8601 timestamp
/// );
/// ```
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
}

impl SqliteBlobStore {
    /// Opens (or creates) the database and ensures the table exists.
    ///
    /// `":memory:"` gives a private in-memory database.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open blob DB at {}", db_path.display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blobs (
                key        TEXT PRIMARY KEY,
                value      BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .context("Failed to create blobs table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("blob DB connection lock poisoned"))
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.conn()?
            .query_row(
                "SELECT value FROM blobs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read blob {}", key))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.conn()?
            .execute(
                r#"
                INSERT INTO blobs (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to write blob {}", key))?;
        Ok(())
    }
}
