//! Query handling: admission, plan, retrieve, reason, assemble.

use crate::context::{ChatStages, PipelineContext};
use crate::types::{
    AnswerResult, CitedSource, LatencyBreakdown, QueryRequest, QueryResponse, RetrievedChunk,
    ABSTAIN_WARNING,
};
use sift_core::AppResult;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Characters of chunk content shown as a source excerpt.
pub const EXCERPT_CHARS: usize = 200;

/// Answer one question.
///
/// # Errors
/// Rejections (`InvalidRequest`, `NotConfigured`, `Overloaded`) are returned
/// before any work starts. A failing reasoning model fails the query; planner
/// and retrieval failures degrade instead.
pub async fn handle_query(ctx: &PipelineContext, request: &QueryRequest) -> AppResult<QueryResponse> {
    request.validate()?;
    let stages = ctx.chat_stages().map_err(|e| {
        tracing::warn!("query rejected: no chat model configured");
        e
    })?;
    let _slot = ctx.gate.try_acquire()?;

    let request_id = new_request_id();
    let span = tracing::info_span!("query", request_id = %request_id);
    run_stages(ctx, stages, &request.question)
        .instrument(span)
        .await
}

async fn run_stages(
    ctx: &PipelineContext,
    stages: &ChatStages,
    question: &str,
) -> AppResult<QueryResponse> {
    let total_start = Instant::now();

    let start = Instant::now();
    let plan = stages.planner.plan(question).await;
    let planning = start.elapsed();
    tracing::info!(steps = plan.len(), duration_ms = round_ms(planning), "planning_done");

    let start = Instant::now();
    let evidence = ctx.executor.execute(&plan).await;
    let retrieval = start.elapsed();
    tracing::info!(chunks = evidence.len(), duration_ms = round_ms(retrieval), "retrieval_done");

    let start = Instant::now();
    let answer = stages.agent.answer(question, &evidence).await.map_err(|e| {
        tracing::error!(error = %e, "pipeline_error");
        e
    })?;
    let reasoning = start.elapsed();
    tracing::info!(
        abstained = answer.abstained,
        duration_ms = round_ms(reasoning),
        "reasoning_done"
    );

    let latency = LatencyBreakdown {
        planning_ms: round_ms(planning),
        retrieval_ms: round_ms(retrieval),
        reasoning_ms: round_ms(reasoning),
        total_ms: round_ms(total_start.elapsed()),
    };
    Ok(assemble_response(answer, &evidence, latency))
}

/// Eight hex characters, enough to correlate log lines for one query.
fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn round_ms(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

fn excerpt(content: &str) -> String {
    if content.chars().count() > EXCERPT_CHARS {
        let head: String = content.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

fn cited_source(chunk: &RetrievedChunk) -> CitedSource {
    CitedSource {
        source_id: chunk.source_id.clone(),
        source_type: chunk.source_type,
        excerpt: excerpt(&chunk.content),
        score: chunk.score,
    }
}

/// Build the response: one source per cited id, described by its first
/// evidence chunk. Ids that match no evidence are dropped. When nothing
/// usable was cited, every distinct retrieved source is listed instead.
fn assemble_response(
    answer: AnswerResult,
    evidence: &[RetrievedChunk],
    latency: LatencyBreakdown,
) -> QueryResponse {
    let mut sources: Vec<CitedSource> = Vec::with_capacity(answer.cited_source_ids.len());
    for id in &answer.cited_source_ids {
        match evidence.iter().find(|chunk| &chunk.source_id == id) {
            Some(chunk) => sources.push(cited_source(chunk)),
            None => tracing::debug!(source_id = %id, "cited source not in evidence"),
        }
    }

    if sources.is_empty() {
        let mut seen = HashSet::new();
        sources = evidence
            .iter()
            .filter(|chunk| seen.insert(chunk.source_id.as_str()))
            .map(cited_source)
            .collect();
    }

    QueryResponse {
        answer: answer.answer,
        sources,
        latency,
        abstained: answer.abstained,
        warning: if answer.abstained {
            ABSTAIN_WARNING.to_string()
        } else {
            String::new()
        },
    }
}
