use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

pub const URLS_KEY: &str = "urls";
pub const DARK_MODE_KEY: &str = "darkMode";
/// Present (holding the start time) while some process is running a batch.
pub const RUNNING_KEY: &str = "running";

const SELECT_SQL: &str = "SELECT value FROM kv WHERE key = ?1";
const UPSERT_SQL: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";
const DELETE_SQL: &str = "DELETE FROM kv WHERE key = ?1";

/// Local key/value storage backed by a single SQLite table.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        // Another ccmeta invocation may hold the write lock for a moment.
        conn.busy_timeout(Duration::from_secs(5))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(SELECT_SQL, [key], |r| r.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(UPSERT_SQL, rusqlite::params![key, value])?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.conn.execute(DELETE_SQL, [key])?;
        Ok(())
    }

    /// Read-modify-write of one key inside an immediate transaction, so
    /// concurrent invocations never overwrite each other's changes.
    /// `f` gets the current value and returns the new one (`None` removes
    /// the key) plus a result passed back to the caller.
    pub fn update_item<T, F>(&mut self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(Option<String>) -> Result<(Option<String>, T)>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx.query_row(SELECT_SQL, [key], |r| r.get(0)).optional()?;
        let (next, out) = f(current)?;
        match next {
            Some(value) => tx.execute(UPSERT_SQL, rusqlite::params![key, value])?,
            None => tx.execute(DELETE_SQL, [key])?,
        };
        tx.commit()?;
        Ok(out)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}
