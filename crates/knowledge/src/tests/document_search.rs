//! Ingest-then-search tests for document retrieval ranking.

use crate::embeddings::providers::MockProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::SqliteVectorIndex;
use crate::ingest::{ingest_documents, source_id_for, ChunkOptions};
use crate::metadata::SqliteMetadataStore;
use crate::types::KnowledgeChunk;
use crate::vector_index::VectorSearch;
use std::fs;
use tempfile::TempDir;

/// Helper to create a normalized embedding.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn chunk(id: &str, text: &str, embedding: Vec<f32>) -> KnowledgeChunk {
    KnowledgeChunk {
        id: id.to_string(),
        source_id: format!("src-{}", id),
        position: 0,
        text: text.to_string(),
        embedding,
        metadata: serde_json::json!({}),
    }
}

#[tokio::test]
async fn test_relevant_chunk_ranks_first() {
    let temp = TempDir::new().unwrap();
    let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();

    index
        .upsert_chunk(&chunk(
            "rust",
            "Rust is a systems programming language",
            normalize(&[1.0, 0.5, 0.2, 0.1]),
        ))
        .unwrap();
    index
        .upsert_chunk(&chunk(
            "pasta",
            "Cooking recipes for pasta",
            normalize(&[-0.3, -0.8, 0.4, -0.2]),
        ))
        .unwrap();

    let hits = index
        .query(&normalize(&[0.9, 0.4, 0.3, 0.1]), 5)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "rust");
    assert_eq!(hits[0].metadata["source_id"], "src-rust");
    assert!(hits[0].distance < 0.1, "distance was {}", hits[0].distance);
    assert!(hits[1].distance > 1.0, "opposed vectors sit past distance 1");
}

#[tokio::test]
async fn test_top_k_bounds_results() {
    let temp = TempDir::new().unwrap();
    let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();

    for i in 0..8 {
        index
            .upsert_chunk(&chunk(
                &format!("c{}", i),
                "filler",
                normalize(&[1.0, i as f32, 0.0]),
            ))
            .unwrap();
    }

    let hits = index.query(&[1.0, 0.0, 0.0], 3).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["c0", "c1", "c2"]);
}

#[tokio::test]
async fn test_ingested_document_is_found_by_topic() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    let graphene = docs.join("graphene.txt");
    fs::write(
        &graphene,
        "Graphene monolayers show exceptional electrical conductivity at room temperature.",
    )
    .unwrap();
    fs::write(
        docs.join("poetry.txt"),
        "Medieval poets favoured alliterative verse and oral performance.",
    )
    .unwrap();

    let index = SqliteVectorIndex::open(&temp.path().join("index.db")).unwrap();
    let store = SqliteMetadataStore::open(&temp.path().join("sources.db")).unwrap();
    let embedder = MockProvider::new(384);

    ingest_documents(
        &[docs],
        &embedder,
        &index,
        &store,
        ChunkOptions {
            chunk_size: 512,
            chunk_overlap: 64,
        },
    )
    .await
    .unwrap();

    let query = embedder.embed("graphene electrical conductivity").await.unwrap();
    let hits = index.query(&query, 1).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata["source_id"], source_id_for(&graphene).as_str());
}
