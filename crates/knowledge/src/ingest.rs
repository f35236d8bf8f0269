//! Local ingestion: documents and arXiv papers into the vector index, tables
//! into the metadata store.

use crate::arxiv::paper_source_id;
use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::index::SqliteVectorIndex;
use crate::metadata::SqliteMetadataStore;
use crate::parser;
use crate::table::read_csv_columns;
use crate::types::{
    IngestStats, KnowledgeChunk, Paper, SourceRecord, ARXIV_SOURCE, DOCUMENT_SOURCE,
    STRUCTURED_SOURCE,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use sift_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Chunking parameters for document ingestion.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Stable identifier for a file: first 16 hex chars of the SHA-256 of its
/// absolute path. Re-ingesting the same file replaces its previous entry.
pub fn source_id_for(path: &Path) -> String {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    let digest = Sha256::digest(absolute.to_string_lossy().as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Ingest every supported document under `paths`.
///
/// A file that cannot be parsed or embedded is recorded in
/// [`IngestStats::skipped`] and does not stop the run.
pub async fn ingest_documents(
    paths: &[PathBuf],
    embedder: &dyn EmbeddingProvider,
    index: &SqliteVectorIndex,
    store: &SqliteMetadataStore,
    options: ChunkOptions,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let mut stats = IngestStats::default();

    for file in collect_files(paths) {
        match ingest_document(&file, embedder, index, store, options).await {
            Ok((chunks, bytes)) => {
                stats.sources_count += 1;
                stats.chunks_count += chunks;
                stats.bytes_processed += bytes;
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", file, e);
                stats.skipped.push(file.display().to_string());
            }
        }
    }

    stats.duration_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        "Ingested {} documents, {} chunks, {} bytes in {:.2}s",
        stats.sources_count,
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

/// Expand directories into the supported files beneath them.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && parser::is_supported(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

async fn ingest_document(
    path: &Path,
    embedder: &dyn EmbeddingProvider,
    index: &SqliteVectorIndex,
    store: &SqliteMetadataStore,
    options: ChunkOptions,
) -> AppResult<(u32, u64)> {
    tracing::debug!("Processing file: {:?}", path);

    let text = parser::parse_file(path)?;
    let source_id = source_id_for(path);

    let candidates = chunk_text(&source_id, &text, options.chunk_size, options.chunk_overlap);
    if candidates.is_empty() {
        return Err(AppError::Knowledge("No text chunks extracted".to_string()));
    }

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != candidates.len() {
        return Err(AppError::Knowledge(format!(
            "Embedding provider returned {} vectors for {} chunks",
            embeddings.len(),
            candidates.len()
        )));
    }

    let chunks: Vec<KnowledgeChunk> = candidates
        .into_iter()
        .zip(embeddings)
        .map(|(candidate, embedding)| KnowledgeChunk {
            id: format!("{}_{}", candidate.source_id, candidate.position),
            source_id: candidate.source_id,
            position: candidate.position,
            text: candidate.text,
            embedding,
            metadata: candidate.metadata,
        })
        .collect();

    index.replace_source_chunks(&source_id, &chunks)?;

    let chunk_count = chunks.len() as u32;
    store.upsert_source(&SourceRecord {
        source_id,
        source_type: DOCUMENT_SOURCE.to_string(),
        title: file_title(path),
        metadata: serde_json::json!({
            "path": path.display().to_string(),
            "chunk_count": chunk_count,
        }),
        ingested_at: Utc::now().to_rfc3339(),
    })?;

    Ok((chunk_count, text.len() as u64))
}

/// Make fetched papers searchable alongside local documents.
///
/// Every paper is registered as an `arxiv` source. Title and abstract become
/// one chunk in the shared vector index; a paper whose embedding fails stays
/// registered but is listed in [`IngestStats::skipped`].
pub async fn ingest_papers(
    papers: &[Paper],
    embedder: &dyn EmbeddingProvider,
    index: &SqliteVectorIndex,
    store: &SqliteMetadataStore,
) -> AppResult<IngestStats> {
    if papers.is_empty() {
        return Err(AppError::Knowledge(
            "No arXiv entries returned; check the query or id list".to_string(),
        ));
    }

    let start = Instant::now();
    let mut stats = IngestStats::default();

    for paper in papers {
        let source_id = paper_source_id(&paper.id);
        store.upsert_source(&SourceRecord {
            source_id: source_id.clone(),
            source_type: ARXIV_SOURCE.to_string(),
            title: paper.title.chars().take(500).collect(),
            metadata: serde_json::json!({
                "arxiv_id": paper.id,
                "authors": paper.authors,
                "link_abs": paper.link,
            }),
            ingested_at: Utc::now().to_rfc3339(),
        })?;
        stats.sources_count += 1;

        let text = format!("{}\n\n{}", paper.title, paper.abstract_text);
        let embedding = match embedder.embed(&text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(arxiv_id = %paper.id, "Skipping paper embedding: {}", e);
                stats.skipped.push(paper.id.clone());
                continue;
            }
        };

        let chunk = KnowledgeChunk {
            id: format!("arxiv_{}", source_id),
            source_id: source_id.clone(),
            position: 0,
            embedding,
            metadata: serde_json::json!({
                "source_type": ARXIV_SOURCE,
                "arxiv_id": paper.id,
            }),
            text,
        };
        stats.bytes_processed += chunk.text.len() as u64;
        index.replace_source_chunks(&source_id, std::slice::from_ref(&chunk))?;
        stats.chunks_count += 1;
    }

    stats.duration_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        "Ingested {} papers ({} embedded) in {:.2}s",
        stats.sources_count,
        stats.chunks_count,
        stats.duration_secs
    );

    Ok(stats)
}

/// Register a CSV file as a structured source.
///
/// The file is copied to `tables_dir/<source_id>.csv` so later edits to the
/// original do not change what retrieval sees.
pub fn register_table(
    path: &Path,
    title: Option<&str>,
    tables_dir: &Path,
    store: &SqliteMetadataStore,
) -> AppResult<SourceRecord> {
    if !path.is_file() {
        return Err(AppError::Knowledge(format!("Table not found: {:?}", path)));
    }
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(AppError::Knowledge(
            "Only CSV tables are supported".to_string(),
        ));
    }

    let columns = read_csv_columns(path)?;
    let source_id = source_id_for(path);

    std::fs::create_dir_all(tables_dir)?;
    let dest = tables_dir.join(format!("{}.csv", source_id));
    std::fs::copy(path, &dest)?;

    let schema: serde_json::Map<String, serde_json::Value> = columns
        .iter()
        .map(|c| (c.clone(), serde_json::Value::from("string")))
        .collect();

    let record = SourceRecord {
        source_id,
        source_type: STRUCTURED_SOURCE.to_string(),
        title: title.map(str::to_string).unwrap_or_else(|| file_title(path)),
        metadata: serde_json::json!({
            "path": path.display().to_string(),
            "table_path": dest.display().to_string(),
            "columns": columns,
            "schema": schema,
        }),
        ingested_at: Utc::now().to_rfc3339(),
    };
    store.upsert_source(&record)?;

    tracing::info!(source_id = %record.source_id, "Registered table {:?}", path);
    Ok(record)
}

fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;
    use crate::vector_index::VectorSearch;
    use std::fs;
    use tempfile::TempDir;

    fn paper(id: &str, title: &str) -> Paper {
        Paper {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: format!("Abstract of {}", title),
            authors: vec!["Ada Lovelace".to_string()],
            link: format!("http://arxiv.org/abs/{}", id),
        }
    }

    /// Embeds everything except texts mentioning "unembeddable".
    #[derive(Debug)]
    struct PickyEmbedder(MockProvider);

    #[async_trait::async_trait]
    impl EmbeddingProvider for PickyEmbedder {
        fn provider_name(&self) -> &str {
            "picky"
        }

        fn model_name(&self) -> &str {
            "picky"
        }

        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains("unembeddable")) {
                return Err(AppError::Knowledge("embedding service down".to_string()));
            }
            self.0.embed_batch(texts).await
        }
    }

    const OPTIONS: ChunkOptions = ChunkOptions {
        chunk_size: 64,
        chunk_overlap: 8,
    };

    #[test]
    fn test_source_id_is_stable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "x").unwrap();

        let id = source_id_for(&path);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, source_id_for(&path));
        assert_ne!(id, source_id_for(&temp.path().join("b.txt")));
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("one.md"), "# Title\n\n".to_string() + &"graphene ".repeat(30)).unwrap();
        fs::write(docs.join("two.txt"), "perovskite solar cells").unwrap();
        fs::write(docs.join("skip.bin"), "ignored").unwrap();

        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();
        let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();
        let embedder = MockProvider::new(64);

        let stats = ingest_documents(&[docs], &embedder, &index, &store, OPTIONS)
            .await
            .unwrap();

        assert_eq!(stats.sources_count, 2);
        assert!(stats.chunks_count >= 2);
        assert!(stats.skipped.is_empty());
        assert_eq!(index.count().unwrap(), stats.chunks_count as u64);

        let sources = store.sources_by_type(DOCUMENT_SOURCE).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "one.md");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty.txt");
        fs::write(&empty, "   ").unwrap();

        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();
        let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();
        let embedder = MockProvider::new(16);

        let stats = ingest_documents(
            &[empty, temp.path().join("missing.md")],
            &embedder,
            &index,
            &store,
            OPTIONS,
        )
        .await
        .unwrap();

        assert_eq!(stats.sources_count, 0);
        assert_eq!(stats.skipped.len(), 2);
    }

    #[test]
    fn test_register_table() {
        let temp = TempDir::new().unwrap();
        let csv_path = temp.path().join("elements.csv");
        fs::write(&csv_path, "element,mass\nH,1.008\n").unwrap();
        let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();

        let record =
            register_table(&csv_path, None, &temp.path().join("tables"), &store).unwrap();

        assert_eq!(record.source_type, STRUCTURED_SOURCE);
        assert_eq!(record.title, "elements.csv");
        let table_path = record.metadata_str("table_path").unwrap();
        assert!(Path::new(table_path).exists());
        assert_eq!(record.metadata["columns"], serde_json::json!(["element", "mass"]));
        assert_eq!(store.sources_by_type(STRUCTURED_SOURCE).unwrap().len(), 1);
    }

    #[test]
    fn test_register_non_csv_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        fs::write(&path, "{}").unwrap();
        let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();

        assert!(register_table(&path, None, &temp.path().join("tables"), &store).is_err());
    }

    #[tokio::test]
    async fn test_ingest_papers_one_chunk_each() {
        let temp = TempDir::new().unwrap();
        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();
        let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();
        let embedder = MockProvider::new(64);
        let papers = vec![
            paper("2101.00001v1", "Graphene transport"),
            paper("hep-th/9901001v2", "String dualities"),
        ];

        let stats = ingest_papers(&papers, &embedder, &index, &store).await.unwrap();

        assert_eq!(stats.sources_count, 2);
        assert_eq!(stats.chunks_count, 2);
        assert_eq!(index.count().unwrap(), 2);

        let sources = store.sources_by_type(ARXIV_SOURCE).unwrap();
        let ids: Vec<_> = sources.iter().map(|s| s.source_id.as_str()).collect();
        assert_eq!(ids, vec!["2101.00001v1", "hep-th_9901001v2"]);
        assert_eq!(sources[1].metadata_str("arxiv_id"), Some("hep-th/9901001v2"));

        let query = embedder
            .embed("String dualities\n\nAbstract of String dualities")
            .await
            .unwrap();
        let hits = index.query(&query, 1).await.unwrap();
        assert_eq!(hits[0].id, "arxiv_hep-th_9901001v2");
        assert_eq!(hits[0].metadata["source_id"], "hep-th_9901001v2");
        assert!(hits[0].document.starts_with("String dualities\n\n"));

        // Re-ingesting replaces rather than duplicates
        ingest_papers(&papers, &embedder, &index, &store).await.unwrap();
        assert_eq!(index.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_papers_embedding_failure_is_skipped() {
        let temp = TempDir::new().unwrap();
        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();
        let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();
        let embedder = PickyEmbedder(MockProvider::new(32));
        let papers = vec![
            paper("2101.00001v1", "Graphene transport"),
            paper("2101.00002v1", "An unembeddable paper"),
        ];

        let stats = ingest_papers(&papers, &embedder, &index, &store).await.unwrap();

        assert_eq!(stats.sources_count, 2);
        assert_eq!(stats.chunks_count, 1);
        assert_eq!(stats.skipped, vec!["2101.00002v1".to_string()]);
        assert_eq!(index.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_no_papers_is_error() {
        let temp = TempDir::new().unwrap();
        let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();
        let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();
        let embedder = MockProvider::new(32);

        assert!(ingest_papers(&[], &embedder, &index, &store).await.is_err());
    }
}
