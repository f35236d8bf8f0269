//! Whole-pipeline scenarios through `handle_query`.

use super::mocks::{paper, retrievers_with_papers, text, FailingPapers, ScriptedLlm, StaticPapers};
use crate::context::PipelineContext;
use crate::pipeline::handle_query;
use crate::reasoning::agent::NO_EVIDENCE_ANSWER;
use crate::types::{QueryRequest, SourceType, ABSTAIN_WARNING};
use sift_core::AppError;
use sift_llm::LlmClient;
use sift_prompt::{builtin_prompt, PLANNER_PROMPT_ID, REASONING_PROMPT_ID};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const ARXIV_PLAN: &str =
    r#"{"steps": [{"source_type": "arxiv", "query": "all:quantum error correction", "reason": "recent papers"}]}"#;

fn context(llm: Arc<dyn LlmClient>, papers: Arc<StaticPapers>, capacity: usize) -> PipelineContext {
    PipelineContext::new(retrievers_with_papers(papers), capacity)
        .with_chat_model(
            llm,
            "test-model",
            builtin_prompt(PLANNER_PROMPT_ID).unwrap(),
            builtin_prompt(REASONING_PROMPT_ID).unwrap(),
            0,
        )
        .with_planner_backoff(Duration::from_millis(1))
}

fn two_papers() -> Arc<StaticPapers> {
    Arc::new(StaticPapers::new(vec![
        paper("2101.00001v1", "Surface codes at scale"),
        paper("2101.00002v2", "Decoding with neural networks"),
    ]))
}

#[tokio::test]
async fn test_arxiv_only_question() {
    let llm = Arc::new(ScriptedLlm::planning_then_answering(
        ARXIV_PLAN,
        "Surface codes scale well [Source 2101.00001v1].",
    ));
    let ctx = context(llm.clone(), two_papers(), 2);

    let response = handle_query(&ctx, &QueryRequest::new("How do surface codes scale?"))
        .await
        .unwrap();

    assert!(!response.abstained);
    assert!(response.warning.is_empty());
    assert_eq!(response.answer, "Surface codes scale well [Source 2101.00001v1].");

    let paper_ids: HashSet<&str> = ["2101.00001v1", "2101.00002v2"].into_iter().collect();
    assert!(!response.sources.is_empty());
    for source in &response.sources {
        assert!(paper_ids.contains(source.source_id.as_str()));
        assert_eq!(source.source_type, SourceType::Arxiv);
        assert_eq!(source.score, 0.95);
    }
    assert_eq!(response.sources.len(), 1);

    // One planning call plus one reasoning round
    assert_eq!(llm.calls(), 2);
    let reasoning_prompt = &llm.requests()[1].messages[1].content;
    assert_eq!(reasoning_prompt.matches("[Source ").count(), 2);

    assert!(response.latency.total_ms >= response.latency.planning_ms);
    assert_eq!(ctx.gate().available(), 2);
}

#[tokio::test]
async fn test_no_evidence_abstains_with_warning() {
    let llm = Arc::new(ScriptedLlm::planning_then_answering(ARXIV_PLAN, "unused"));
    let ctx = PipelineContext::new(retrievers_with_papers(Arc::new(FailingPapers)), 1)
        .with_chat_model(
            llm.clone(),
            "test-model",
            builtin_prompt(PLANNER_PROMPT_ID).unwrap(),
            builtin_prompt(REASONING_PROMPT_ID).unwrap(),
            0,
        );

    let response = handle_query(&ctx, &QueryRequest::new("anything")).await.unwrap();

    assert!(response.abstained);
    assert_eq!(response.answer, NO_EVIDENCE_ANSWER);
    assert_eq!(response.warning, ABSTAIN_WARNING);
    assert!(response.sources.is_empty());
    // Only the planner reached the model
    assert_eq!(llm.calls(), 1);
    assert_eq!(llm.reasoning_calls(), 0);
}

#[tokio::test]
async fn test_uncited_answer_lists_retrieved_sources() {
    let llm = Arc::new(ScriptedLlm::planning_then_answering(
        ARXIV_PLAN,
        "The evidence discusses decoders.",
    ));
    let ctx = context(llm, two_papers(), 1);

    let response = handle_query(&ctx, &QueryRequest::new("q")).await.unwrap();

    let ids: Vec<_> = response.sources.iter().map(|s| s.source_id.as_str()).collect();
    assert_eq!(ids, vec!["2101.00001v1", "2101.00002v2"]);
}

#[tokio::test]
async fn test_reasoning_failure_fails_query_and_frees_slot() {
    let llm = Arc::new(ScriptedLlm::new(|_, request| {
        if request.tools.is_empty() {
            Ok(text(ARXIV_PLAN))
        } else {
            Err(AppError::Llm("500 Internal Server Error".to_string()))
        }
    }));
    let ctx = context(llm, two_papers(), 1);

    let err = handle_query(&ctx, &QueryRequest::new("q")).await.unwrap_err();

    assert!(matches!(err, AppError::Llm(_)));
    assert!(!err.is_rejection());
    assert_eq!(ctx.gate().available(), 1);
}

#[tokio::test]
async fn test_missing_chat_model_is_rejected() {
    let ctx = PipelineContext::new(retrievers_with_papers(two_papers()), 1);

    let err = handle_query(&ctx, &QueryRequest::new("q")).await.unwrap_err();

    assert!(matches!(err, AppError::NotConfigured(_)));
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_invalid_question_is_rejected_before_planning() {
    let llm = Arc::new(ScriptedLlm::planning_then_answering(ARXIV_PLAN, "a"));
    let ctx = context(llm.clone(), two_papers(), 1);

    let empty = handle_query(&ctx, &QueryRequest::new("")).await.unwrap_err();
    let long = handle_query(&ctx, &QueryRequest::new("q".repeat(2001)))
        .await
        .unwrap_err();

    assert!(matches!(empty, AppError::InvalidRequest(_)));
    assert!(matches!(long, AppError::InvalidRequest(_)));
    assert_eq!(llm.calls(), 0);
}
