mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::*;

/// SQLite-backed confession storage.
///
/// The connection sits behind a mutex, so concurrent creates from different
/// authors are serialized and never interleave within a row. Clones share the
/// same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Confession operations
    // ============================================================

    /// Validate and persist a new confession under a fresh id.
    ///
    /// A [`ValidationError`] is returned inside the `anyhow::Error` so callers
    /// can tell it apart from storage failures with `downcast_ref`.
    pub fn create_confession(&self, input: CreateConfessionInput) -> Result<ConfessionRecord> {
        input.validate()?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO confessions (id, recipient_name, sender_name, message, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.recipient_name,
                &input.sender_name,
                &input.message,
                now.to_rfc3339(),
            ),
        )?;

        tracing::debug!(%id, "Stored confession");

        Ok(ConfessionRecord {
            id,
            recipient_name: input.recipient_name,
            sender_name: input.sender_name,
            message: input.message,
            created_at: now,
        })
    }

    /// Look up a confession. Any id that was never issued, including strings
    /// that are not UUIDs at all, yields `None`.
    pub fn get_confession(&self, id: &str) -> Result<Option<ConfessionRecord>> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, recipient_name, sender_name, message, created_at
             FROM confessions WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(ConfessionRecord {
                id: parse_uuid(row.get::<_, String>(0)?),
                recipient_name: row.get(1)?,
                sender_name: row.get(2)?,
                message: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
            }))
        } else {
            Ok(None)
        }
    }
}

fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "confess")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("confess.db"))
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
