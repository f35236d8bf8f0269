//! Source metadata store.
//!
//! Every ingested document and registered table is recorded in a `sources`
//! table; the structured retrieval path discovers its tables here.

use crate::types::SourceRecord;
use rusqlite::{params, Connection, OptionalExtension};
use sift_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Busy timeout for concurrent readers and writers.
const DB_TIMEOUT: Duration = Duration::from_secs(5);

/// Read access to registered sources.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// All sources of the given type, in registration order.
    async fn list_sources(&self, source_type: &str) -> AppResult<Vec<SourceRecord>>;
}

/// SQLite implementation of [`MetadataStore`].
#[derive(Debug, Clone)]
pub struct SqliteMetadataStore {
    db_path: PathBuf,
}

impl SqliteMetadataStore {
    /// Open (creating if needed) the store at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        let store = Self {
            db_path: db_path.to_path_buf(),
        };
        store.connect()?;
        Ok(store)
    }

    fn connect(&self) -> AppResult<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create metadata directory: {}", e))
            })?;
        }

        let conn = Connection::open(&self.db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open metadata store: {}", e)))?;
        conn.busy_timeout(DB_TIMEOUT)
            .map_err(|e| AppError::Knowledge(format!("Failed to set busy timeout: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                source_id TEXT PRIMARY KEY,
                source_type TEXT NOT NULL,
                title TEXT DEFAULT '',
                metadata TEXT DEFAULT '{}',
                ingested_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS data_version (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO data_version (key, value) VALUES ('global', 1);
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        Ok(conn)
    }

    /// Insert or replace a source and bump the data version.
    pub fn upsert_source(&self, record: &SourceRecord) -> AppResult<()> {
        let conn = self.connect()?;
        let metadata_json = serde_json::to_string(&record.metadata)?;

        conn.execute(
            "INSERT OR REPLACE INTO sources (source_id, source_type, title, metadata, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.source_id,
                record.source_type,
                record.title,
                metadata_json,
                record.ingested_at,
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to upsert source: {}", e)))?;

        conn.execute(
            "UPDATE data_version SET value = value + 1 WHERE key = 'global'",
            [],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to bump data version: {}", e)))?;

        tracing::debug!(source_id = %record.source_id, source_type = %record.source_type, "Registered source");
        Ok(())
    }

    /// Sources of one type, synchronously.
    pub fn sources_by_type(&self, source_type: &str) -> AppResult<Vec<SourceRecord>> {
        self.select(
            "SELECT source_id, source_type, title, metadata, ingested_at FROM sources
             WHERE source_type = ?1 ORDER BY rowid",
            Some(source_type),
        )
    }

    /// Every registered source.
    pub fn all_sources(&self) -> AppResult<Vec<SourceRecord>> {
        self.select(
            "SELECT source_id, source_type, title, metadata, ingested_at FROM sources ORDER BY rowid",
            None,
        )
    }

    /// Counter incremented on every registration.
    pub fn data_version(&self) -> AppResult<i64> {
        let conn = self.connect()?;
        let version = conn
            .query_row(
                "SELECT value FROM data_version WHERE key = 'global'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|e| AppError::Knowledge(format!("Failed to read data version: {}", e)))?;
        Ok(version.unwrap_or(1))
    }

    fn select(&self, sql: &str, source_type: Option<&str>) -> AppResult<Vec<SourceRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<SourceRecord> {
            let metadata: Option<String> = row.get(3)?;
            Ok(SourceRecord {
                source_id: row.get(0)?,
                source_type: row.get(1)?,
                title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                metadata: metadata
                    .and_then(|m| serde_json::from_str(&m).ok())
                    .unwrap_or_else(|| serde_json::json!({})),
                ingested_at: row.get(4)?,
            })
        };

        let rows = match source_type {
            Some(t) => stmt.query_map(params![t], map_row),
            None => stmt.query_map([], map_row),
        }
        .map_err(|e| AppError::Knowledge(format!("Failed to query sources: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Knowledge(format!("Failed to read source: {}", e)))
    }
}

#[async_trait::async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn list_sources(&self, source_type: &str) -> AppResult<Vec<SourceRecord>> {
        let store = self.clone();
        let source_type = source_type.to_string();
        tokio::task::spawn_blocking(move || store.sources_by_type(&source_type))
            .await
            .map_err(|e| AppError::Knowledge(format!("Metadata task failed: {}", e)))?
    }
}
