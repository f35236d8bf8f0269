//! Executor fan-out: failure isolation, ordering and deduplication.

use super::mocks::{
    hit, paper, retrievers_with_papers, FailingPapers, FailingVectors, PanickingPapers,
    StaticMetadata, StaticPapers, StaticVectors,
};
use crate::executor::RetrievalExecutor;
use crate::types::{RetrievalPlan, RetrievalStep, SourceType};
use sift_knowledge::{CsvTableReader, SourceRecord, STRUCTURED_SOURCE};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn step(source_type: SourceType, query: &str) -> RetrievalStep {
    RetrievalStep {
        source_type,
        query: query.to_string(),
        reason: "test".to_string(),
    }
}

fn plan(steps: Vec<RetrievalStep>) -> RetrievalPlan {
    RetrievalPlan { steps }
}

#[tokio::test]
async fn test_failing_step_contributes_nothing() {
    let mut retrievers = retrievers_with_papers(Arc::new(FailingPapers));
    retrievers.vectors = Arc::new(StaticVectors(vec![
        hit("d1_0", "d1", "Graphene has high electron mobility.", 0.25),
        hit("d2_0", "d2", "Silicon is a semiconductor.", 1.0),
    ]));
    let executor = RetrievalExecutor::new(retrievers);

    let evidence = executor
        .execute(&plan(vec![
            step(SourceType::Arxiv, "graphene"),
            step(SourceType::Document, "graphene"),
        ]))
        .await;

    assert_eq!(evidence.len(), 2);
    assert!(evidence.iter().all(|c| c.source_type == SourceType::Document));
    assert_eq!(evidence[0].source_id, "d1");
    assert_eq!(evidence[0].score, 0.8);
    assert_eq!(evidence[1].score, 0.5);
}

#[tokio::test]
async fn test_panicking_step_is_isolated() {
    let mut retrievers = retrievers_with_papers(Arc::new(PanickingPapers));
    retrievers.vectors = Arc::new(StaticVectors(vec![hit("d1_0", "d1", "text", 0.0)]));
    let executor = RetrievalExecutor::new(retrievers);

    let evidence = executor
        .execute(&plan(vec![
            step(SourceType::Document, "q"),
            step(SourceType::Arxiv, "q"),
        ]))
        .await;

    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].score, 1.0);
}

#[tokio::test]
async fn test_all_steps_failing_yields_empty_evidence() {
    let mut retrievers = retrievers_with_papers(Arc::new(FailingPapers));
    retrievers.vectors = Arc::new(FailingVectors);
    retrievers.embedder = None;
    let executor = RetrievalExecutor::new(retrievers);

    let evidence = executor
        .execute(&plan(vec![
            step(SourceType::Document, "q"),
            step(SourceType::Arxiv, "q"),
            step(SourceType::Structured, "q"),
        ]))
        .await;

    assert!(evidence.is_empty());
}

#[tokio::test]
async fn test_results_follow_submission_order() {
    let slow = StaticPapers::new(vec![paper("2101.00001v1", "Slow paper")])
        .with_delay(Duration::from_millis(50));
    let mut retrievers = retrievers_with_papers(Arc::new(slow));
    retrievers.vectors = Arc::new(StaticVectors(vec![hit("d1_0", "d1", "fast", 0.0)]));
    let executor = RetrievalExecutor::new(retrievers);

    let evidence = executor
        .execute(&plan(vec![
            step(SourceType::Arxiv, "slow"),
            step(SourceType::Document, "fast"),
        ]))
        .await;

    let ids: Vec<_> = evidence.iter().map(|c| c.source_id.as_str()).collect();
    assert_eq!(ids, vec!["2101.00001v1", "d1"]);
}

#[tokio::test]
async fn test_repeated_steps_are_deduplicated() {
    let papers = Arc::new(StaticPapers::new(vec![
        paper("2101.00001v1", "First"),
        paper("hep-th/9901001v1", "Second"),
    ]));
    let executor = RetrievalExecutor::new(retrievers_with_papers(papers.clone()));

    let evidence = executor
        .execute(&plan(vec![
            step(SourceType::Arxiv, "a"),
            step(SourceType::Arxiv, "b"),
        ]))
        .await;

    assert_eq!(papers.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(evidence.len(), 2);
    assert_eq!(evidence[1].source_id, "hep-th_9901001v1");
    assert_eq!(evidence[1].metadata["arxiv_id"], "hep-th/9901001v1");
    assert_eq!(evidence[1].score, 0.95);
    assert!(evidence[0].content.starts_with("Title: First\n\nAbstract: "));
}

#[tokio::test]
async fn test_document_hit_without_source_id() {
    let mut retrievers = retrievers_with_papers(Arc::new(FailingPapers));
    let mut orphan = hit("x_0", "ignored", "orphan text", 0.5);
    orphan.metadata = serde_json::json!({});
    retrievers.vectors = Arc::new(StaticVectors(vec![orphan]));
    let executor = RetrievalExecutor::new(retrievers);

    let evidence = executor.execute(&plan(vec![step(SourceType::Document, "q")])).await;

    assert_eq!(evidence[0].source_id, "unknown");
}

#[tokio::test]
async fn test_structured_step_samples_registered_tables() {
    let temp = TempDir::new().unwrap();
    let table_path = temp.path().join("yields.csv");
    let mut csv = String::from("year,yield\n");
    for year in 2000..2030 {
        csv.push_str(&format!("{},{}.5\n", year, year - 1990));
    }
    fs::write(&table_path, csv).unwrap();

    let record = |id: &str, path: &str| SourceRecord {
        source_id: id.to_string(),
        source_type: STRUCTURED_SOURCE.to_string(),
        title: format!("{} table", id),
        metadata: serde_json::json!({ "table_path": path }),
        ingested_at: "2024-01-01T00:00:00Z".to_string(),
    };

    let mut retrievers = retrievers_with_papers(Arc::new(FailingPapers));
    retrievers.tables = Arc::new(CsvTableReader::new());
    retrievers.metadata = Arc::new(StaticMetadata(vec![
        record("yields", table_path.to_str().unwrap()),
        record("missing", "/nonexistent/table.csv"),
    ]));
    let executor = RetrievalExecutor::new(retrievers);

    let evidence = executor
        .execute(&plan(vec![step(SourceType::Structured, "yield by year")]))
        .await;

    assert_eq!(evidence.len(), 1);
    let chunk = &evidence[0];
    assert_eq!(chunk.source_id, "yields");
    assert_eq!(chunk.score, 0.9);
    assert_eq!(chunk.metadata["title"], "yields table");
    assert!(chunk.content.starts_with("Columns: [\"year\", \"yield\"]"));
    assert!(chunk.content.contains("2019 | 29.5"));
    assert!(!chunk.content.contains("2020 | 30.5"));
}
