//! Retrieval executor.
//!
//! Each plan step runs as its own task against the collaborator for its source
//! type. Results are joined in submission order, so the evidence set is
//! deterministic regardless of which step finishes first. A step that fails
//! or panics contributes nothing.

use crate::types::{RetrievalPlan, RetrievedChunk, SourceType};
use sift_core::{AppError, AppResult};
use sift_knowledge::{
    paper_source_id, EmbeddingProvider, MetadataStore, PaperSearch, TableReader, VectorSearch,
    MAX_SAMPLE_ROWS, STRUCTURED_SOURCE,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Characters of content that, with the source id, identify a duplicate chunk.
pub const DEDUP_PREFIX_CHARS: usize = 100;

const STRUCTURED_SCORE: f64 = 0.9;
const ARXIV_SCORE: f64 = 0.95;

/// Collaborators and limits the executor dispatches to.
#[derive(Clone)]
pub struct Retrievers {
    /// `None` disables document search
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub vectors: Arc<dyn VectorSearch>,
    pub metadata: Arc<dyn MetadataStore>,
    pub tables: Arc<dyn TableReader>,
    pub papers: Arc<dyn PaperSearch>,
    pub top_k_docs: usize,
    pub arxiv_max_results: usize,
    pub arxiv_timeout: Duration,
}

/// Runs retrieval plans concurrently.
#[derive(Clone)]
pub struct RetrievalExecutor {
    retrievers: Arc<Retrievers>,
}

impl RetrievalExecutor {
    pub fn new(retrievers: Retrievers) -> Self {
        Self {
            retrievers: Arc::new(retrievers),
        }
    }

    /// Run every step of `plan` and return the deduplicated evidence set.
    pub async fn execute(&self, plan: &RetrievalPlan) -> Vec<RetrievedChunk> {
        let handles: Vec<_> = plan
            .steps
            .iter()
            .map(|step| {
                let retrievers = Arc::clone(&self.retrievers);
                let source_type = step.source_type;
                let query = step.query.clone();
                tokio::spawn(async move { run_step(&retrievers, source_type, &query).await })
            })
            .collect();

        let mut merged = Vec::new();
        for (step, handle) in plan.steps.iter().zip(handles) {
            match handle.await {
                Ok(Ok(chunks)) => {
                    tracing::debug!(
                        source_type = %step.source_type,
                        chunks = chunks.len(),
                        "retrieval step finished"
                    );
                    merged.extend(chunks);
                }
                Ok(Err(e)) => {
                    tracing::warn!(source_type = %step.source_type, error = %e, "retrieval step failed");
                }
                Err(e) => {
                    tracing::warn!(source_type = %step.source_type, error = %e, "retrieval step panicked");
                }
            }
        }

        dedup_chunks(merged)
    }
}

async fn run_step(
    retrievers: &Retrievers,
    source_type: SourceType,
    query: &str,
) -> AppResult<Vec<RetrievedChunk>> {
    match source_type {
        SourceType::Document => document_step(retrievers, query).await,
        SourceType::Structured => structured_step(retrievers).await,
        SourceType::Arxiv => arxiv_step(retrievers, query).await,
    }
}

async fn document_step(retrievers: &Retrievers, query: &str) -> AppResult<Vec<RetrievedChunk>> {
    let embedder = retrievers.embedder.as_ref().ok_or_else(|| {
        AppError::Retrieval("document search needs an embedding provider".to_string())
    })?;
    let embedding = embedder.embed(query).await?;
    let hits = retrievers
        .vectors
        .query(&embedding, retrievers.top_k_docs)
        .await?;

    Ok(hits
        .into_iter()
        .map(|hit| {
            let source_id = hit
                .metadata
                .get("source_id")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            RetrievedChunk {
                source_id,
                source_type: SourceType::Document,
                content: hit.document,
                score: 1.0 / (1.0 + f64::from(hit.distance)),
                metadata: hit.metadata,
            }
        })
        .collect())
}

/// Sample every registered table. The query is not interpreted.
async fn structured_step(retrievers: &Retrievers) -> AppResult<Vec<RetrievedChunk>> {
    let sources = retrievers.metadata.list_sources(STRUCTURED_SOURCE).await?;

    let mut chunks = Vec::with_capacity(sources.len());
    for source in sources {
        let Some(table_path) = source.metadata_str("table_path") else {
            tracing::debug!(source_id = %source.source_id, "structured source has no table_path");
            continue;
        };
        let table_path = Path::new(table_path);
        if !table_path.exists() {
            tracing::debug!(source_id = %source.source_id, "structured table missing on disk");
            continue;
        }

        match retrievers
            .tables
            .read_sample(table_path, MAX_SAMPLE_ROWS)
            .await
        {
            Ok(sample) => chunks.push(RetrievedChunk {
                source_id: source.source_id.clone(),
                source_type: SourceType::Structured,
                content: format_table(&sample.columns, &sample.rows),
                score: STRUCTURED_SCORE,
                metadata: serde_json::json!({ "title": source.title }),
            }),
            Err(e) => {
                tracing::warn!(source_id = %source.source_id, error = %e, "structured source unreadable");
            }
        }
    }
    Ok(chunks)
}

async fn arxiv_step(retrievers: &Retrievers, query: &str) -> AppResult<Vec<RetrievedChunk>> {
    let papers = retrievers
        .papers
        .search(query, retrievers.arxiv_max_results, retrievers.arxiv_timeout)
        .await?;

    Ok(papers
        .into_iter()
        .map(|paper| RetrievedChunk {
            source_id: paper_source_id(&paper.id),
            source_type: SourceType::Arxiv,
            content: format!("Title: {}\n\nAbstract: {}", paper.title, paper.abstract_text),
            score: ARXIV_SCORE,
            metadata: serde_json::json!({
                "arxiv_id": paper.id,
                "link_abs": paper.link,
                "authors": paper.authors,
            }),
        })
        .collect())
}

/// Render a table sample as a column header line followed by the rows.
fn format_table(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut text = format!("Columns: {:?}\n\n", columns);
    text.push_str(&columns.join(" | "));
    for row in rows {
        text.push('\n');
        text.push_str(&row.join(" | "));
    }
    text
}

/// Drop chunks whose `(source_id, content prefix)` was already seen; first wins.
pub fn dedup_chunks(chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| {
            let prefix: String = chunk.content.chars().take(DEDUP_PREFIX_CHARS).collect();
            seen.insert((chunk.source_id.clone(), prefix))
        })
        .collect()
}
