//! Local history of finished tests, one summary row per report.

use directories::ProjectDirs;
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

use crate::summary::Report;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub test_id: String,
    pub taken_at: String,
    pub status_code: u8,
    pub success: bool,
    pub duration_ms: f64,
    pub rounds: i64,
    pub blocking_round_duration_ms: Option<f64>,
    pub cognitive_processing_index: Option<f64>,
    pub block_count: i64,
}

/// Database manager for test history.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (and create if needed) the default on-disk history database.
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path().unwrap_or_else(|| PathBuf::from("cogspeed_history.db"));
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("failed to create directory: {e}")),
                )
            })?;
        }
        Self::open(db_path)
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path.as_ref().to_path_buf())
    }

    fn open(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS test_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id TEXT NOT NULL UNIQUE,
                taken_at TEXT NOT NULL,
                status_code INTEGER NOT NULL,
                success BOOLEAN NOT NULL,
                duration_ms REAL NOT NULL,
                rounds INTEGER NOT NULL,
                brd_ms REAL,
                cpi REAL,
                block_count INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_test_results_taken_at ON test_results(taken_at)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// History path under $HOME/.local/state/cogspeed, falling back to the
    /// platform-specific state directory.
    fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("cogspeed");
            Some(state_dir.join("history.db"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "cogspeed") {
            Some(proj_dirs.data_local_dir().join("history.db"))
        } else {
            None
        }
    }

    pub fn record_report(&self, report: &Report) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO test_results
            (test_id, taken_at, status_code, success, duration_ms, rounds, brd_ms, cpi, block_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                report.test_id.to_string(),
                report.taken_at_utc.to_rfc3339(),
                report.status_code,
                report.success,
                report.test_duration_ms,
                report.number_of_rounds as i64,
                report.blocking_round_duration_ms,
                report.cognitive_processing_index,
                report.block_count as i64,
            ],
        )?;
        Ok(())
    }

    /// Most recent results, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT test_id, taken_at, status_code, success, duration_ms, rounds,
                   brd_ms, cpi, block_count
            FROM test_results
            ORDER BY taken_at DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(HistoryEntry {
                test_id: row.get(0)?,
                taken_at: row.get(1)?,
                status_code: row.get(2)?,
                success: row.get(3)?,
                duration_ms: row.get(4)?,
                rounds: row.get(5)?,
                blocking_round_duration_ms: row.get(6)?,
                cognitive_processing_index: row.get(7)?,
                block_count: row.get(8)?,
            })
        })?;
        rows.collect()
    }

    /// Highest CPI across successful tests, if any exists.
    pub fn best_cpi(&self) -> Result<Option<f64>> {
        self.conn.query_row(
            "SELECT MAX(cpi) FROM test_results WHERE success = 1",
            [],
            |row| row.get(0),
        )
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM test_results", [])?;
        Ok(())
    }
}
