//! Local evidence sources for Sift.
//!
//! Each retrieval collaborator is a trait with one local implementation:
//! - [`VectorSearch`]: SQLite vector index over document chunks
//! - [`MetadataStore`]: SQLite registry of ingested sources
//! - [`TableReader`]: bounded CSV sampling
//! - [`PaperSearch`]: live arXiv search
//!
//! plus the embedding providers and the ingestion routines that fill the
//! local stores.

pub mod arxiv;
pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod metadata;
pub mod parser;
pub mod table;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use arxiv::{paper_source_id, ArxivClient, PaperSearch};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteVectorIndex;
pub use ingest::{ingest_documents, ingest_papers, register_table, ChunkOptions};
pub use metadata::{MetadataStore, SqliteMetadataStore};
pub use table::{CsvTableReader, TableReader, MAX_SAMPLE_ROWS};
pub use types::{
    IngestStats, Paper, SourceRecord, TableSample, VectorHit, ARXIV_SOURCE, DOCUMENT_SOURCE,
    STRUCTURED_SOURCE,
};
pub use vector_index::VectorSearch;
