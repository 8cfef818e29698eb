//! SQLite-backed bounded upload history
//!
//! Records are appended with their summary in a single row and the table is
//! pruned back to capacity inside the same transaction, so readers never see
//! a record without its summary and concurrent appends cannot evict each
//! other's freshly inserted rows with a stale keep-set.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Summary, UploadRecord};

/// Number of uploads retained by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// Upper bound on retained uploads, whatever the configured capacity
pub const MAX_HISTORY_CAPACITY: usize = 5;

/// Outcome of an append: the stored record and how many old ones were evicted
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub record: UploadRecord,
    pub evicted: usize,
}

/// Bounded, time-ordered history of uploads
#[derive(Clone)]
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
    capacity: usize,
}

impl HistoryStore {
    /// Create or open the store at the given path
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::store(format!("Failed to open database: {}", e)))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| Error::store(format!("Failed to set busy timeout: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            capacity: bounded_capacity(capacity),
        };
        store.migrate(true)?;
        Ok(store)
    }

    /// Create an in-memory store
    pub fn in_memory(capacity: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::store(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            capacity: bounded_capacity(capacity),
        };
        store.migrate(false)?;
        Ok(store)
    }

    fn migrate(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
            "#,
            )
            .map_err(|e| Error::store(format!("Failed to set pragmas: {}", e)))?;
        }

        // uploaded_at is fixed-width RFC 3339 (microseconds, 'Z'), so text order is time order
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS upload_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                summary TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_upload_history_recency
                ON upload_history(uploaded_at DESC, id DESC);
        "#,
        )
        .map_err(|e| Error::store(format!("Failed to run migrations: {}", e)))?;

        tracing::debug!("History store migrations complete");
        Ok(())
    }

    /// Maximum number of retained records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Persist a new record and evict everything outside the keep-set
    pub fn append(&self, filename: &str, summary: &Summary) -> Result<AppendOutcome> {
        self.append_with(filename, summary, Utc::now)
    }

    #[cfg(test)]
    pub(crate) fn append_at(
        &self,
        filename: &str,
        summary: &Summary,
        uploaded_at: DateTime<Utc>,
    ) -> Result<AppendOutcome> {
        self.append_with(filename, summary, move || uploaded_at)
    }

    fn append_with<F>(&self, filename: &str, summary: &Summary, clock: F) -> Result<AppendOutcome>
    where
        F: FnOnce() -> DateTime<Utc>,
    {
        let summary_json = serde_json::to_string(summary)?;

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::store(format!("Failed to begin transaction: {}", e)))?;

        // Stamped while holding the write lock so recency follows commit order
        let uploaded_at_text = encode_timestamp(&clock());

        tx.execute(
            "INSERT INTO upload_history (filename, uploaded_at, summary) VALUES (?1, ?2, ?3)",
            params![filename, uploaded_at_text, summary_json],
        )
        .map_err(|e| Error::store(format!("Failed to insert upload: {}", e)))?;
        let id = tx.last_insert_rowid();

        let evicted = tx
            .execute(
                r#"
                DELETE FROM upload_history
                WHERE id NOT IN (
                    SELECT id FROM upload_history
                    ORDER BY uploaded_at DESC, id DESC
                    LIMIT ?1
                )
                "#,
                params![self.capacity as i64],
            )
            .map_err(|e| Error::store(format!("Failed to evict old uploads: {}", e)))?;

        tx.commit()
            .map_err(|e| Error::store(format!("Failed to commit upload: {}", e)))?;

        if evicted > 0 {
            tracing::info!("Evicted {} upload(s) beyond capacity {}", evicted, self.capacity);
        }

        // Decode from the stored text so the returned timestamp matches later reads
        let uploaded_at = decode_timestamp(&uploaded_at_text)?;

        Ok(AppendOutcome {
            record: UploadRecord {
                id,
                filename: filename.to_string(),
                uploaded_at,
                summary: summary.clone(),
            },
            evicted,
        })
    }

    /// Up to `limit` records, most recent first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<UploadRecord>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, filename, uploaded_at, summary FROM upload_history
                ORDER BY uploaded_at DESC, id DESC
                LIMIT ?1
                "#,
            )
            .map_err(|e| Error::store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![limit as i64], row_to_raw)
            .map_err(|e| Error::store(format!("Failed to list uploads: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| Error::store(format!("Failed to read upload: {}", e)))?;
            records.push(raw.into_record()?);
        }
        Ok(records)
    }

    /// The most recent record, if any
    pub fn latest(&self) -> Result<Option<UploadRecord>> {
        Ok(self.list_recent(1)?.into_iter().next())
    }

    /// Look up a retained record by id
    pub fn get(&self, id: i64) -> Result<Option<UploadRecord>> {
        let conn = self.conn.lock();

        let raw = conn
            .query_row(
                "SELECT id, filename, uploaded_at, summary FROM upload_history WHERE id = ?1",
                params![id],
                row_to_raw,
            )
            .optional()
            .map_err(|e| Error::store(format!("Failed to get upload: {}", e)))?;

        raw.map(RawRecord::into_record).transpose()
    }

    /// Number of retained records
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM upload_history", [], |row| row.get(0))
            .map_err(|e| Error::store(format!("Failed to count uploads: {}", e)))?;
        Ok(count as usize)
    }
}

fn bounded_capacity(capacity: usize) -> usize {
    if capacity > MAX_HISTORY_CAPACITY {
        tracing::warn!(
            "History capacity {} exceeds the maximum of {}, clamping",
            capacity,
            MAX_HISTORY_CAPACITY
        );
    }
    capacity.clamp(1, MAX_HISTORY_CAPACITY)
}

/// Row as stored, before the summary blob and timestamp are decoded
struct RawRecord {
    id: i64,
    filename: String,
    uploaded_at: String,
    summary: String,
}

impl RawRecord {
    fn into_record(self) -> Result<UploadRecord> {
        let summary: Summary = serde_json::from_str(&self.summary).map_err(|e| {
            Error::store(format!("Corrupt summary for upload {}: {}", self.id, e))
        })?;
        Ok(UploadRecord {
            id: self.id,
            filename: self.filename,
            uploaded_at: decode_timestamp(&self.uploaded_at)?,
            summary,
        })
    }
}

fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        uploaded_at: row.get(2)?,
        summary: row.get(3)?,
    })
}

fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::store(format!("Corrupt timestamp '{}': {}", raw, e)))
}
