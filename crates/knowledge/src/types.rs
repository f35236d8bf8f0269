//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// Source type tag stored for ingested documents.
pub const DOCUMENT_SOURCE: &str = "document";

/// Source type tag stored for registered tables.
pub const STRUCTURED_SOURCE: &str = "structured";

/// Source type tag stored for papers ingested from arXiv.
pub const ARXIV_SOURCE: &str = "arxiv";

/// A source registered in the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Stable source identifier (16 hex chars of the path hash)
    pub source_id: String,

    /// "document" or "structured"
    pub source_type: String,

    /// Display title, defaults to the file name
    #[serde(default)]
    pub title: String,

    /// Free-form metadata; structured sources carry `table_path`
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// RFC 3339 ingestion timestamp
    pub ingested_at: String,
}

impl SourceRecord {
    /// Look up a string value in the metadata object.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// A chunk candidate produced by the chunker, before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Metadata (character offsets)
    pub metadata: serde_json::Value,
}

/// A text chunk with embedding, as stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier (`<source_id>_<position>`)
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Metadata stored alongside the chunk
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One nearest-neighbour result from a vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    /// Chunk identifier
    pub id: String,

    /// Chunk text
    pub document: String,

    /// Chunk metadata; includes `source_id`
    pub metadata: serde_json::Value,

    /// Cosine distance (0 = identical direction)
    pub distance: f32,
}

/// A bounded sample read from a tabular source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSample {
    /// Header row
    pub columns: Vec<String>,

    /// Data rows, in file order
    pub rows: Vec<Vec<String>>,
}

/// A paper returned by a live literature search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// arXiv identifier, e.g. "2101.00001v1" or "hep-th/9901001v1"
    pub id: String,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub authors: Vec<String>,

    /// Abstract page URL
    pub link: String,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Sources registered or refreshed
    pub sources_count: u32,

    /// Chunks written to the index
    pub chunks_count: u32,

    /// Bytes of extracted text processed
    pub bytes_processed: u64,

    /// Files or papers skipped because they could not be read or embedded
    pub skipped: Vec<String>,

    /// Wall-clock duration
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_str_lookup() {
        let record = SourceRecord {
            source_id: "abc".to_string(),
            source_type: STRUCTURED_SOURCE.to_string(),
            title: "t".to_string(),
            metadata: serde_json::json!({"table_path": "/tmp/t.csv", "columns": ["a"]}),
            ingested_at: "2024-01-01T00:00:00Z".to_string(),
        };
        assert_eq!(record.metadata_str("table_path"), Some("/tmp/t.csv"));
        assert_eq!(record.metadata_str("columns"), None);
        assert_eq!(record.metadata_str("missing"), None);
    }

    #[test]
    fn test_paper_serializes_abstract_field() {
        let paper = Paper {
            id: "2101.00001v1".to_string(),
            title: "T".to_string(),
            abstract_text: "A".to_string(),
            authors: vec![],
            link: String::new(),
        };
        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["abstract"], "A");
    }
}
