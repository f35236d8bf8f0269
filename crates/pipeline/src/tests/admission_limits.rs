//! Admission gate under concurrent queries.

use super::mocks::{paper, retrievers_with_papers, GatedLlm, StaticPapers};
use crate::context::PipelineContext;
use crate::pipeline::handle_query;
use crate::types::QueryRequest;
use sift_core::AppError;
use sift_prompt::{builtin_prompt, PLANNER_PROMPT_ID, REASONING_PROMPT_ID};
use std::sync::Arc;
use std::time::Duration;

const CAPACITY: usize = 2;

#[tokio::test]
async fn test_query_over_capacity_is_rejected_immediately() {
    let (llm, mut entered, release) = GatedLlm::new();
    let papers = Arc::new(StaticPapers::new(vec![paper("2101.00001v1", "Paper")]));
    let ctx = Arc::new(
        PipelineContext::new(retrievers_with_papers(papers), CAPACITY).with_chat_model(
            Arc::new(llm),
            "test-model",
            builtin_prompt(PLANNER_PROMPT_ID).unwrap(),
            builtin_prompt(REASONING_PROMPT_ID).unwrap(),
            0,
        ),
    );

    let mut running = Vec::new();
    for i in 0..CAPACITY {
        let ctx = Arc::clone(&ctx);
        running.push(tokio::spawn(async move {
            handle_query(&ctx, &QueryRequest::new(format!("question {}", i))).await
        }));
    }

    // Wait until every admitted query is parked inside the planner call
    for _ in 0..CAPACITY {
        entered.recv().await.unwrap();
    }
    assert_eq!(ctx.gate().available(), 0);

    let rejected = tokio::time::timeout(
        Duration::from_millis(200),
        handle_query(&ctx, &QueryRequest::new("one too many")),
    )
    .await
    .expect("rejection must not wait for a slot");
    let err = rejected.unwrap_err();
    assert!(matches!(err, AppError::Overloaded(_)));
    assert!(err.is_rejection());

    release.add_permits(100);
    for handle in running {
        let response = handle.await.unwrap().unwrap();
        assert!(!response.abstained);
    }
    assert_eq!(ctx.gate().available(), CAPACITY);

    // Slots are reusable after release
    assert!(handle_query(&ctx, &QueryRequest::new("again")).await.is_ok());
}
