//! SQLite-backed vector index for document chunks.
//!
//! Embeddings are stored as little-endian `f32` blobs and compared by brute
//! force; distance is cosine distance (`1 - cosine similarity`).

use crate::types::{KnowledgeChunk, VectorHit};
use crate::vector_index::VectorSearch;
use rusqlite::{params, Connection};
use sift_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Vector index persisted in a single SQLite file.
///
/// Every operation opens its own connection, so the handle is cheap to
/// share across tasks.
#[derive(Debug, Clone)]
pub struct SqliteVectorIndex {
    db_path: PathBuf,
}

impl SqliteVectorIndex {
    /// Open (creating if needed) the index at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        let index = Self {
            db_path: db_path.to_path_buf(),
        };
        index.connect()?;
        tracing::debug!("Initialized SQLite index at {:?}", db_path);
        Ok(index)
    }

    /// Location of the index file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> AppResult<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(&self.db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        Ok(conn)
    }

    /// Insert or replace a chunk.
    ///
    /// The stored metadata always includes `source_id` and `chunk_idx`.
    pub fn upsert_chunk(&self, chunk: &KnowledgeChunk) -> AppResult<()> {
        let conn = self.connect()?;
        insert_chunk(&conn, chunk)
    }

    /// Replace every chunk of a source in one transaction.
    pub fn replace_source_chunks(&self, source_id: &str, chunks: &[KnowledgeChunk]) -> AppResult<()> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        tx.execute("DELETE FROM chunks WHERE source_id = ?1", params![source_id])
            .map_err(|e| AppError::Knowledge(format!("Failed to delete chunks: {}", e)))?;
        for chunk in chunks {
            insert_chunk(&tx, chunk)?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit chunks: {}", e)))
    }

    /// Number of chunks stored.
    pub fn count(&self) -> AppResult<u64> {
        let conn = self.connect()?;
        conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get::<_, i64>(0))
            .map(|v| v as u64)
            .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))
    }

    /// Brute-force nearest neighbours, synchronously.
    pub fn query_blocking(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<VectorHit>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT id, text, embedding, metadata FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, text, blob, metadata_json) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;

            let stored = match bytes_to_embedding(&blob) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(chunk_id = %id, "Skipping chunk with bad embedding: {}", e);
                    continue;
                }
            };
            let metadata = serde_json::from_str(&metadata_json)
                .unwrap_or_else(|_| serde_json::json!({}));

            hits.push(VectorHit {
                id,
                document: text,
                metadata,
                distance: 1.0 - cosine_similarity(embedding, &stored),
            });
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        tracing::debug!("Retrieved {} chunks (requested top-{})", hits.len(), top_k);
        Ok(hits)
    }
}

#[async_trait::async_trait]
impl VectorSearch for SqliteVectorIndex {
    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<VectorHit>> {
        let index = self.clone();
        let embedding = embedding.to_vec();
        tokio::task::spawn_blocking(move || index.query_blocking(&embedding, top_k))
            .await
            .map_err(|e| AppError::Knowledge(format!("Vector search task failed: {}", e)))?
    }
}

fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let mut metadata = match &chunk.metadata {
        serde_json::Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    metadata.insert("source_id".to_string(), chunk.source_id.clone().into());
    metadata.insert("chunk_idx".to_string(), chunk.position.into());

    let metadata_json = serde_json::to_string(&metadata)?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(&chunk.embedding),
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(id: &str, source_id: &str, position: u32, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: source_id.to_string(),
            position,
            text: format!("text of {}", id),
            embedding,
            metadata: serde_json::json!({"start": 0}),
        }
    }

    #[test]
    fn test_open_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/index.db");
        let index = SqliteVectorIndex::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_query_orders_by_distance() {
        let temp = TempDir::new().unwrap();
        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();

        index.upsert_chunk(&chunk("far", "s1", 0, vec![0.0, 1.0, 0.0])).unwrap();
        index.upsert_chunk(&chunk("near", "s2", 0, vec![1.0, 0.1, 0.0])).unwrap();
        index.upsert_chunk(&chunk("exact", "s3", 0, vec![1.0, 0.0, 0.0])).unwrap();

        let hits = index.query_blocking(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "exact");
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].id, "near");
        assert_eq!(hits[0].metadata["source_id"], "s3");
        assert_eq!(hits[0].metadata["chunk_idx"], 0);
        assert_eq!(hits[0].metadata["start"], 0);
    }

    #[test]
    fn test_replace_source_chunks() {
        let temp = TempDir::new().unwrap();
        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();

        index
            .replace_source_chunks(
                "s1",
                &[chunk("s1_0", "s1", 0, vec![1.0]), chunk("s1_1", "s1", 1, vec![1.0])],
            )
            .unwrap();
        index.replace_source_chunks("s1", &[chunk("s1_0", "s1", 0, vec![1.0])]).unwrap();

        assert_eq!(index.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_async_query() {
        let temp = TempDir::new().unwrap();
        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();
        index.upsert_chunk(&chunk("a", "s1", 0, vec![0.6, 0.8])).unwrap();

        let hits = index.query(&[0.6, 0.8], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_embedding_bytes() {
        let bytes = embedding_to_bytes(&[1.5, -2.0]);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![1.5, -2.0]);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }
}
