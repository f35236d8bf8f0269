//! Planner retry and fallback behaviour against a scripted model.

use super::mocks::{text, ScriptedLlm};
use crate::planner::{RetrievalPlanner, DEFAULT_BACKOFF_STEP};
use crate::types::SourceType;
use sift_core::AppError;
use sift_prompt::{builtin_prompt, PLANNER_PROMPT_ID};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn planner(llm: Arc<ScriptedLlm>, max_retries: u32) -> RetrievalPlanner {
    let prompt = builtin_prompt(PLANNER_PROMPT_ID).unwrap();
    RetrievalPlanner::new(llm, "test-model", prompt, max_retries)
        .with_backoff_step(Duration::from_millis(1))
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let llm = Arc::new(ScriptedLlm::new(|n, _| {
        if n < 2 {
            Err(AppError::Llm("503 Service Unavailable".to_string()))
        } else {
            Ok(text(
                r#"{"steps": [{"source_type": "arxiv", "query": "all:perovskite", "reason": "papers"}]}"#,
            ))
        }
    }));

    let plan = planner(Arc::clone(&llm), 2).plan("perovskite efficiency").await;

    assert_eq!(llm.calls(), 3);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.steps[0].source_type, SourceType::Arxiv);
    assert_eq!(plan.steps[0].query, "all:perovskite");
}

#[tokio::test]
async fn test_exhausted_retries_fall_back() {
    let llm = Arc::new(ScriptedLlm::new(|_, _| {
        Err(AppError::Llm("connection refused".to_string()))
    }));

    let plan = planner(Arc::clone(&llm), 2).plan("What is CRISPR?").await;

    assert_eq!(llm.calls(), 3);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.steps[0].source_type, SourceType::Document);
    assert_eq!(plan.steps[0].query, "What is CRISPR?");
    assert_eq!(plan.steps[0].reason, "fallback");
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_linearly_per_attempt() {
    let start = tokio::time::Instant::now();
    let call_times = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&call_times);
    let llm = Arc::new(ScriptedLlm::new(move |_, _| {
        recorded.lock().unwrap().push(start.elapsed());
        Err(AppError::Llm("502 Bad Gateway".to_string()))
    }));

    let prompt = builtin_prompt(PLANNER_PROMPT_ID).unwrap();
    let planner = RetrievalPlanner::new(Arc::clone(&llm) as Arc<dyn sift_llm::LlmClient>, "test-model", prompt, 2);
    let plan = planner.plan("Why is the sky blue?").await;

    assert_eq!(DEFAULT_BACKOFF_STEP, Duration::from_millis(500));
    assert_eq!(llm.calls(), 3);
    // Virtual time only moves at the backoff sleeps: 0, +0.5s, +1.0s
    let call_times = call_times.lock().unwrap().clone();
    let expected = [0, 500, 1500].map(Duration::from_millis);
    for (actual, expected) in call_times.iter().zip(expected) {
        assert!(
            *actual >= expected && *actual < expected + Duration::from_millis(5),
            "call at {:?}, expected {:?}",
            actual,
            expected
        );
    }
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(1505));
    assert_eq!(plan.steps[0].reason, "fallback");
    assert_eq!(plan.steps[0].source_type, SourceType::Document);
}

#[tokio::test]
async fn test_unparseable_output_is_not_retried() {
    let llm = Arc::new(ScriptedLlm::new(|_, _| Ok(text("Sure! Search arXiv."))));

    let plan = planner(Arc::clone(&llm), 2).plan("q").await;

    assert_eq!(llm.calls(), 1);
    assert_eq!(plan.steps[0].reason, "fallback");
}

#[tokio::test]
async fn test_only_disallowed_types_fall_back() {
    let llm = Arc::new(ScriptedLlm::new(|_, _| {
        Ok(text(
            r#"{"steps": [{"source_type": "web", "query": "q", "reason": "r"}, {"source_type": "kaggle", "query": "q", "reason": "r"}]}"#,
        ))
    }));

    let plan = planner(llm, 0).plan("q").await;

    assert!(!plan.is_empty());
    assert_eq!(plan.steps[0].source_type, SourceType::Document);
}

#[tokio::test]
async fn test_fenced_output_keeps_allowed_steps() {
    let llm = Arc::new(ScriptedLlm::new(|_, _| {
        Ok(text(
            "```json\n{\"steps\": [{\"source_type\": \"structured\", \"query\": \"yield by year\", \"reason\": \"numbers\"}, {\"source_type\": \"web\", \"query\": \"x\", \"reason\": \"y\"}, {\"source_type\": \"document\", \"query\": \"yield\", \"reason\": \"context\"}]}\n```",
        ))
    }));

    let plan = planner(llm, 0).plan("q").await;

    let types: Vec<_> = plan.steps.iter().map(|s| s.source_type).collect();
    assert_eq!(types, vec![SourceType::Structured, SourceType::Document]);
}

#[tokio::test]
async fn test_planner_request_shape() {
    let llm = Arc::new(ScriptedLlm::new(|_, _| Ok(text("{}"))));

    planner(Arc::clone(&llm), 0).plan("How hot is the sun?").await;

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.json_mode);
    assert_eq!(request.temperature, Some(0.0));
    assert!(request.tools.is_empty());
    assert_eq!(request.messages.len(), 2);
    assert!(request.messages[1].content.contains("How hot is the sun?"));
}
