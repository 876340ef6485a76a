use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::extract::ConnectionRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS uk_connections (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            location    TEXT NOT NULL,
            profile_url TEXT UNIQUE NOT NULL,
            fetched     BOOLEAN NOT NULL DEFAULT 0,
            saved_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_uk_connections_fetched ON uk_connections(fetched);

        CREATE TABLE IF NOT EXISTS emails (
            id           INTEGER PRIMARY KEY,
            profile_url  TEXT UNIQUE NOT NULL,
            email        TEXT,
            extracted_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ── Connections ──

/// Insert records, ignoring profiles already stored. Returns how many were new.
pub fn save_uk_connections(conn: &Connection, records: &[ConnectionRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO uk_connections (name, location, profile_url, saved_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let saved_at = now();
        for r in records {
            count += stmt.execute(rusqlite::params![r.name, r.location, r.profile_url, saved_at])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct PendingProfile {
    pub id: i64,
    pub profile_url: String,
}

/// Stored connections not yet visited for an email, oldest first.
pub fn fetch_unfetched(conn: &Connection, limit: usize) -> Result<Vec<PendingProfile>> {
    let mut stmt = conn.prepare(
        "SELECT id, profile_url FROM uk_connections
         WHERE fetched = 0
         ORDER BY id ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(PendingProfile {
                id: row.get(0)?,
                profile_url: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_fetched(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("UPDATE uk_connections SET fetched = 1 WHERE id = ?1", [id])?;
    Ok(())
}

// ── Emails ──

/// Record the lookup result for a profile; the first result per profile sticks.
pub fn save_email(conn: &Connection, profile_url: &str, email: Option<&str>) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO emails (profile_url, email, extracted_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![profile_url, email, now()],
    )?;
    Ok(inserted > 0)
}

// ── Stats ──

pub struct Stats {
    pub connections: i64,
    pub fetched: i64,
    pub unfetched: i64,
    pub emails_found: i64,
    pub emails_missing: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };
    let connections = count("SELECT COUNT(*) FROM uk_connections")?;
    let fetched = count("SELECT COUNT(*) FROM uk_connections WHERE fetched = 1")?;
    Ok(Stats {
        connections,
        fetched,
        unfetched: connections - fetched,
        emails_found: count("SELECT COUNT(*) FROM emails WHERE email IS NOT NULL")?,
        emails_missing: count("SELECT COUNT(*) FROM emails WHERE email IS NULL")?,
    })
}
