//! SQLite database operations for stored facts and answer preferences.
//!
//! Row-level helpers take a plain `&Connection` so they can run either on the
//! locked connection or inside a transaction opened by the store.

use crate::error::{MemoryError, MemoryResult};
use orion_memory_types::*;
use rusqlite::{Connection, params, params_from_iter};
use std::sync::{Mutex, MutexGuard};

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &str) -> MemoryResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        Ok(db)
    }

    /// Lock the connection. Single writer at a time; a poisoned lock is
    /// reported as unavailable storage.
    pub fn conn(&self) -> MemoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MemoryError::storage("database lock poisoned"))
    }

    fn create_tables(&self) -> MemoryResult<()> {
        let conn = self.conn()?;

        // AUTOINCREMENT so ids of pruned rows are never handed out again
        conn.execute(
            "CREATE TABLE IF NOT EXISTS facts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_id TEXT NOT NULL,
                text TEXT NOT NULL,
                origin TEXT NOT NULL DEFAULT 'manual',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_facts_subject_id ON facts(subject_id, id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS answer_prefs (
                subject_id TEXT PRIMARY KEY,
                style TEXT NOT NULL DEFAULT 'short',
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        Ok(())
    }
}

// =====================================================
// Fact Operations
// =====================================================

const FACT_COLUMNS: &str = "id, subject_id, text, origin, created_at";

pub fn insert_fact(
    conn: &Connection,
    subject_id: &str,
    text: &str,
    origin: &str,
) -> MemoryResult<Fact> {
    let now = chrono::Utc::now().to_rfc3339();
    insert_fact_at(conn, subject_id, text, origin, &now)
}

/// Insert with an explicit timestamp (used when restoring a backup).
pub fn insert_fact_at(
    conn: &Connection,
    subject_id: &str,
    text: &str,
    origin: &str,
    created_at: &str,
) -> MemoryResult<Fact> {
    conn.execute(
        "INSERT INTO facts (subject_id, text, origin, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![subject_id, text, origin, created_at],
    )?;

    Ok(Fact {
        id: conn.last_insert_rowid(),
        subject_id: subject_id.to_string(),
        text: text.to_string(),
        origin: origin.to_string(),
        created_at: created_at.to_string(),
    })
}

pub fn count_facts(conn: &Connection, subject_id: &str) -> MemoryResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM facts WHERE subject_id = ?1",
        params![subject_id],
        |r| r.get(0),
    )?;
    Ok(count.max(0) as usize)
}

/// All facts for a subject, newest first.
pub fn list_facts_newest_first(conn: &Connection, subject_id: &str) -> MemoryResult<Vec<Fact>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM facts WHERE subject_id = ?1 ORDER BY id DESC",
        FACT_COLUMNS
    ))?;
    let facts = stmt
        .query_map(params![subject_id], row_to_fact)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(facts)
}

/// Up to `n` facts for a subject, oldest first.
pub fn oldest_facts(conn: &Connection, subject_id: &str, n: usize) -> MemoryResult<Vec<Fact>> {
    let limit = i64::try_from(n).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM facts WHERE subject_id = ?1 ORDER BY id ASC LIMIT ?2",
        FACT_COLUMNS
    ))?;
    let facts = stmt
        .query_map(params![subject_id, limit], row_to_fact)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(facts)
}

/// Every fact across subjects, oldest first.
pub fn list_all_facts(conn: &Connection) -> MemoryResult<Vec<Fact>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM facts ORDER BY id ASC",
        FACT_COLUMNS
    ))?;
    let facts = stmt
        .query_map([], row_to_fact)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(facts)
}

/// Delete the given ids regardless of subject. Missing ids are ignored.
pub fn delete_facts(conn: &Connection, ids: &[FactId]) -> MemoryResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let rows = conn.execute(
        &format!("DELETE FROM facts WHERE id IN ({})", placeholders),
        params_from_iter(ids.iter()),
    )?;
    Ok(rows)
}

pub fn delete_subject_facts(conn: &Connection, subject_id: &str) -> MemoryResult<usize> {
    let rows = conn.execute("DELETE FROM facts WHERE subject_id = ?1", params![subject_id])?;
    Ok(rows)
}

pub fn delete_all_facts(conn: &Connection) -> MemoryResult<usize> {
    let rows = conn.execute("DELETE FROM facts", [])?;
    Ok(rows)
}

pub fn list_subjects(conn: &Connection) -> MemoryResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT subject_id FROM facts ORDER BY subject_id")?;
    let subjects = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(subjects)
}

pub fn get_stats(conn: &Connection) -> MemoryResult<MemoryStats> {
    let total_facts: i64 = conn.query_row("SELECT COUNT(*) FROM facts", [], |r| r.get(0))?;
    let subject_count: i64 =
        conn.query_row("SELECT COUNT(DISTINCT subject_id) FROM facts", [], |r| r.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT origin, COUNT(*) FROM facts GROUP BY origin ORDER BY COUNT(*) DESC, origin ASC",
    )?;
    let by_origin = stmt
        .query_map([], |row| {
            Ok(OriginCount {
                origin: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MemoryStats {
        total_facts,
        subject_count,
        by_origin,
    })
}

// =====================================================
// Preference Operations
// =====================================================

pub fn get_answer_style(conn: &Connection, subject_id: &str) -> MemoryResult<AnswerStyle> {
    let result = conn.query_row(
        "SELECT style FROM answer_prefs WHERE subject_id = ?1",
        params![subject_id],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(raw) => Ok(AnswerStyle::from_str(&raw).unwrap_or_else(|| {
            log::warn!(
                "Unknown answer style '{}' stored for subject {}, using default",
                raw,
                subject_id
            );
            AnswerStyle::default()
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(AnswerStyle::default()),
        Err(e) => Err(e.into()),
    }
}

pub fn set_answer_style(conn: &Connection, subject_id: &str, style: AnswerStyle) -> MemoryResult<()> {
    conn.execute(
        "INSERT INTO answer_prefs (subject_id, style, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(subject_id) DO UPDATE SET
             style = excluded.style,
             updated_at = excluded.updated_at",
        params![subject_id, style.as_str()],
    )?;
    Ok(())
}

fn row_to_fact(row: &rusqlite::Row) -> rusqlite::Result<Fact> {
    Ok(Fact {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        text: row.get(2)?,
        origin: row.get(3)?,
        created_at: row.get(4)?,
    })
}
