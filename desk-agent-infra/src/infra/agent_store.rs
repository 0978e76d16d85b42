//! SQLite persistence for command history, remembered preferences, context
//! memory, scheduled tasks, the file index and performance samples.

use chrono::{Local, SecondsFormat};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Stored command results are cut to this many characters.
pub const RESULT_PREVIEW_CHARS: usize = 500;
pub const DEFAULT_IMPORTANCE: i64 = 5;

#[derive(Error, Debug)]
pub enum AgentStoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRecord {
    pub id: i64,
    pub timestamp: String,
    pub command: String,
    pub result: String,
    pub success: bool,
    pub execution_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandStats {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    /// Most used command names (first token), most frequent first.
    pub top_commands: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preference {
    pub key: String,
    pub value: String,
    pub updated_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub id: i64,
    pub context_type: String,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_date: String,
    pub importance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub task_name: String,
    pub command: String,
    pub schedule_time: String,
    pub schedule_type: String,
    pub enabled: bool,
    pub last_run: Option<String>,
    pub created_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileIndexEntry {
    pub filepath: String,
    pub filename: String,
    pub extension: String,
    pub size: u64,
    pub modified_date: String,
    pub hash: String,
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub network_sent: u64,
    pub network_received: u64,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS command_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        command TEXT NOT NULL,
        result TEXT,
        success INTEGER NOT NULL,
        execution_time REAL NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS user_preferences (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_date TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS context_memory (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        context_type TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata TEXT,
        created_date TEXT NOT NULL,
        importance INTEGER NOT NULL DEFAULT 5
    );
    CREATE TABLE IF NOT EXISTS scheduled_tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task_name TEXT NOT NULL,
        command TEXT NOT NULL,
        schedule_time TEXT NOT NULL,
        schedule_type TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        last_run TEXT,
        created_date TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS file_index (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filepath TEXT NOT NULL UNIQUE,
        filename TEXT NOT NULL,
        extension TEXT,
        size INTEGER,
        modified_date TEXT,
        hash TEXT,
        tags TEXT,
        indexed_date TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS system_monitoring (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        cpu_percent REAL,
        memory_percent REAL,
        disk_percent REAL,
        network_sent INTEGER,
        network_received INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_context_rank ON context_memory(importance, created_date);
    CREATE INDEX IF NOT EXISTS idx_file_index_name ON file_index(filename);
";

fn now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// First whitespace-separated token, lowercased.
fn command_name(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn command_from_row(row: &Row<'_>) -> rusqlite::Result<CommandRecord> {
    Ok(CommandRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        command: row.get(2)?,
        result: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        success: row.get(4)?,
        execution_time: row.get(5)?,
    })
}

pub struct AgentStore {
    conn: Mutex<Connection>,
}

impl AgentStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, AgentStoreError> {
        let conn = Connection::open(db_path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("Opened agent store at {}", db_path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and when no database path is wanted.
    pub fn in_memory() -> Result<Self, AgentStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ---- command history ----

    pub fn log_command(
        &self,
        command: &str,
        result: &str,
        success: bool,
        execution_time: f64,
    ) -> Result<i64, AgentStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO command_history (timestamp, command, result, success, execution_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now(),
                command,
                truncate(result, RESULT_PREVIEW_CHARS),
                success,
                execution_time
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest first.
    pub fn recent_commands(&self, limit: usize) -> Result<Vec<CommandRecord>, AgentStoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, command, result, success, execution_time
             FROM command_history ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], command_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Totals and the ten most used command names over the last `window`
    /// commands.
    pub fn command_stats(&self, window: usize) -> Result<CommandStats, AgentStoreError> {
        let recent = self.recent_commands(window)?;
        let successes = recent.iter().filter(|r| r.success).count();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in &recent {
            let name = command_name(&record.command);
            if !name.is_empty() {
                *counts.entry(name).or_insert(0) += 1;
            }
        }
        let mut top_commands: Vec<(String, usize)> = counts.into_iter().collect();
        top_commands.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_commands.truncate(10);

        Ok(CommandStats {
            total: recent.len(),
            successes,
            failures: recent.len() - successes,
            top_commands,
        })
    }

    /// Failed commands among the last `window`, newest first.
    pub fn recent_failures(&self, window: usize) -> Result<Vec<CommandRecord>, AgentStoreError> {
        Ok(self
            .recent_commands(window)?
            .into_iter()
            .filter(|record| !record.success)
            .collect())
    }

    // ---- preferences ----

    pub fn set_preference(&self, key: &str, value: &str) -> Result<(), AgentStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO user_preferences (key, value, updated_date) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_date = excluded.updated_date",
            params![key, value, now()],
        )?;
        Ok(())
    }

    pub fn preference(&self, key: &str) -> Result<Option<String>, AgentStoreError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM user_preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Returns whether the key existed.
    pub fn delete_preference(&self, key: &str) -> Result<bool, AgentStoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM user_preferences WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    pub fn preferences(&self) -> Result<Vec<Preference>, AgentStoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT key, value, updated_date FROM user_preferences ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(Preference {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_date: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- context memory ----

    /// Append a context entry. Importance is clamped to 1..=10.
    pub fn add_context(
        &self,
        context_type: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
        importance: i64,
    ) -> Result<i64, AgentStoreError> {
        let metadata = metadata.map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO context_memory (context_type, content, metadata, created_date, importance)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                context_type,
                content,
                metadata,
                now(),
                importance.clamp(1, 10)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Highest importance first, then newest.
    pub fn relevant_context(
        &self,
        context_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ContextEntry>, AgentStoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, context_type, content, metadata, created_date, importance
             FROM context_memory
             WHERE ?1 IS NULL OR context_type = ?1
             ORDER BY importance DESC, created_date DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![context_type, limit as i64], |row| {
            let metadata: Option<String> = row.get(3)?;
            Ok(ContextEntry {
                id: row.get(0)?,
                context_type: row.get(1)?,
                content: row.get(2)?,
                metadata: metadata.and_then(|raw| serde_json::from_str(&raw).ok()),
                created_date: row.get(4)?,
                importance: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- scheduled tasks ----

    pub fn add_scheduled_task(
        &self,
        task_name: &str,
        command: &str,
        schedule_time: &str,
        schedule_type: &str,
    ) -> Result<i64, AgentStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO scheduled_tasks (task_name, command, schedule_time, schedule_type, created_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![task_name, command, schedule_time, schedule_type, now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Enabled tasks in creation order.
    pub fn scheduled_tasks(&self) -> Result<Vec<ScheduledTask>, AgentStoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, task_name, command, schedule_time, schedule_type, enabled, last_run, created_date
             FROM scheduled_tasks WHERE enabled = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ScheduledTask {
                id: row.get(0)?,
                task_name: row.get(1)?,
                command: row.get(2)?,
                schedule_time: row.get(3)?,
                schedule_type: row.get(4)?,
                enabled: row.get(5)?,
                last_run: row.get(6)?,
                created_date: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- file index ----

    /// Insert or refresh index rows, keyed by file path, in one transaction.
    pub fn upsert_file_index(&self, entries: &[FileIndexEntry]) -> Result<usize, AgentStoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let indexed_date = now();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO file_index
                    (filepath, filename, extension, size, modified_date, hash, tags, indexed_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(filepath) DO UPDATE SET
                    filename = excluded.filename,
                    extension = excluded.extension,
                    size = excluded.size,
                    modified_date = excluded.modified_date,
                    hash = excluded.hash,
                    tags = excluded.tags,
                    indexed_date = excluded.indexed_date",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.filepath,
                    entry.filename,
                    entry.extension,
                    entry.size as i64,
                    entry.modified_date,
                    entry.hash,
                    entry.tags,
                    indexed_date
                ])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    /// LIKE match on file name or tags.
    pub fn search_file_index(&self, query: &str, limit: usize) -> Result<Vec<FileIndexEntry>, AgentStoreError> {
        let pattern = format!("%{}%", query);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT filepath, filename, extension, size, modified_date, hash, tags
             FROM file_index WHERE filename LIKE ?1 OR tags LIKE ?1
             ORDER BY filename LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, limit as i64], |row| {
            Ok(FileIndexEntry {
                filepath: row.get(0)?,
                filename: row.get(1)?,
                extension: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                size: row.get::<_, Option<i64>>(3)?.unwrap_or_default().max(0) as u64,
                modified_date: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                hash: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                tags: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- performance samples ----

    pub fn log_system_sample(&self, sample: &SystemSample) -> Result<i64, AgentStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO system_monitoring
                (timestamp, cpu_percent, memory_percent, disk_percent, network_sent, network_received)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now(),
                sample.cpu_percent,
                sample.memory_percent,
                sample.disk_percent,
                sample.network_sent as i64,
                sample.network_received as i64
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn system_sample_count(&self) -> Result<usize, AgentStoreError> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM system_monitoring", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}
