//! Bounded reads from CSV tables registered as structured sources.

use crate::types::TableSample;
use sift_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Upper bound on rows returned by a sample read.
pub const MAX_SAMPLE_ROWS: usize = 20;

/// Reads a small sample of a table.
#[async_trait::async_trait]
pub trait TableReader: Send + Sync {
    /// Header plus at most `limit` rows (capped at [`MAX_SAMPLE_ROWS`]).
    async fn read_sample(&self, path: &Path, limit: usize) -> AppResult<TableSample>;
}

/// CSV implementation of [`TableReader`].
#[derive(Debug, Clone, Default)]
pub struct CsvTableReader;

impl CsvTableReader {
    pub fn new() -> Self {
        Self
    }
}

/// Read the header and first `limit` well-formed rows of a CSV file.
///
/// Rows whose field count differs from the header are skipped.
pub fn read_csv_sample(path: &Path, limit: usize) -> AppResult<TableSample> {
    let limit = limit.min(MAX_SAMPLE_ROWS);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open table {:?}: {}", path, e)))?;

    let columns = rdr
        .headers()
        .map_err(|e| AppError::Knowledge(format!("Failed to read headers of {:?}: {}", path, e)))?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for result in rdr.records() {
        if rows.len() >= limit {
            break;
        }
        match result {
            Ok(record) => rows.push(record.iter().map(|v| v.to_string()).collect()),
            Err(e) => tracing::debug!("Skipping malformed row in {:?}: {}", path, e),
        }
    }

    Ok(TableSample { columns, rows })
}

/// Column names of a CSV file, for registration.
pub fn read_csv_columns(path: &Path) -> AppResult<Vec<String>> {
    Ok(read_csv_sample(path, 0)?.columns)
}

#[async_trait::async_trait]
impl TableReader for CsvTableReader {
    async fn read_sample(&self, path: &Path, limit: usize) -> AppResult<TableSample> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_csv_sample(&path, limit))
            .await
            .map_err(|e| AppError::Knowledge(format!("Table read task failed: {}", e)))?
    }
}
