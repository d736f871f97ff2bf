//! Account persistence using SQLite.
//!
//! Stores registered accounts so they survive restarts.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use std::sync::{Mutex, MutexGuard};

use super::Account;

/// Persists account records in SQLite.
pub struct AccountStore {
    conn: Mutex<Connection>,
}

impl AccountStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open account DB at {}", db_path))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("account DB connection lock poisoned"))
    }

    fn create_table(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS accounts (
                    id         TEXT PRIMARY KEY,
                    name       TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );",
            )
            .context("Failed to create accounts table")?;
        Ok(())
    }

    /// Inserts a new account. Fails if the id already exists.
    pub fn insert(&self, account: &Account) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO accounts (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![account.id, account.name, account.created_at.to_rfc3339()],
            )
            .context("Failed to insert account")?;
        Ok(())
    }

    /// Deletes an account by id. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()?
            .execute("DELETE FROM accounts WHERE id = ?1", params![id])
            .context("Failed to delete account")?;
        Ok(rows > 0)
    }

    /// Returns all persisted accounts ordered by creation time.
    pub fn load_all(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM accounts ORDER BY created_at ASC")
            .context("Failed to prepare load_all query")?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let created_at_str: String = row.get(2)?;
                Ok((id, name, created_at_str))
            })
            .context("Failed to query accounts")?;

        let mut accounts = Vec::new();
        for row in rows {
            let (id, name, created_at_str) = row.context("Failed to read account row")?;
            let created_at = created_at_str
                .parse()
                .with_context(|| format!("Failed to parse created_at for account {}", id))?;
            accounts.push(Account {
                id,
                name,
                created_at,
            });
        }
        Ok(accounts)
    }
}
