use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::state::LiveScores;

const CACHE_DIR: &str = "crease_live";
const DB_FILE: &str = "scores.sqlite";

/// Anything that can hand back the last known scores for a match.
pub trait MatchSource: Send + Sync {
    fn load(&self, match_id: &str) -> Result<Option<LiveScores>>;
}

/// Checkpoint storage. Saving is explicit and never part of a scoring transition.
pub trait ScoreStore: MatchSource {
    fn save(&self, match_id: &str, scores: &LiveScores) -> Result<()>;
}

pub struct SqliteScoreStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteScoreStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saved_at(&self, match_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.query_row(
            "SELECT saved_at FROM live_scores WHERE match_id = ?1",
            params![match_id],
            |row| row.get(0),
        )
        .optional()
        .context("query checkpoint timestamp")
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS live_scores (
            match_id TEXT PRIMARY KEY,
            scores_json TEXT NOT NULL,
            saved_at TEXT NOT NULL
        );
        "#,
    )
    .context("init live_scores schema")?;
    Ok(())
}

impl MatchSource for SqliteScoreStore {
    fn load(&self, match_id: &str) -> Result<Option<LiveScores>> {
        let raw: Option<String> = {
            let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
            conn.query_row(
                "SELECT scores_json FROM live_scores WHERE match_id = ?1",
                params![match_id],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("load checkpoint for match {match_id}"))?
        };
        let Some(raw) = raw else {
            return Ok(None);
        };
        let scores = serde_json::from_str::<LiveScores>(&raw)
            .with_context(|| format!("decode checkpoint for match {match_id}"))?;
        Ok(Some(scores))
    }
}

impl ScoreStore for SqliteScoreStore {
    fn save(&self, match_id: &str, scores: &LiveScores) -> Result<()> {
        let json = serde_json::to_string(scores).context("serialize live scores")?;
        let saved_at = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            r#"
            INSERT INTO live_scores (match_id, scores_json, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(match_id) DO UPDATE SET
                scores_json = excluded.scores_json,
                saved_at = excluded.saved_at
            "#,
            params![match_id, json, saved_at],
        )
        .with_context(|| format!("save checkpoint for match {match_id}"))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    entries: Mutex<HashMap<String, LiveScores>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchSource for MemoryScoreStore {
    fn load(&self, match_id: &str) -> Result<Option<LiveScores>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(match_id).cloned())
    }
}

impl ScoreStore for MemoryScoreStore {
    fn save(&self, match_id: &str, scores: &LiveScores) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(match_id.to_string(), scores.clone());
        Ok(())
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}
