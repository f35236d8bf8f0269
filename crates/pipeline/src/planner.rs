//! Retrieval planner.
//!
//! One logical model call turns a question into an ordered list of retrieval
//! steps. Transport failures are retried with linear backoff; any failure that
//! survives the retries, and any unusable output, yields the fallback plan.

use crate::types::{RetrievalPlan, RetrievalStep, SourceType};
use serde::Deserialize;
use sift_core::AppResult;
use sift_llm::{system_message, user_message, ChatMessage, LlmClient, LlmRequest};
use sift_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default delay unit between planner attempts; attempt `n` waits `n` units.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Plan shape as the model writes it, before validation.
#[derive(Debug, Deserialize)]
struct RawPlan {
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    source_type: String,
    query: String,
    #[serde(default)]
    reason: String,
}

/// Turns questions into retrieval plans.
pub struct RetrievalPlanner {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    max_retries: u32,
    backoff_step: Duration,
}

impl RetrievalPlanner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        max_retries: u32,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
            max_retries,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }

    /// Override the backoff unit.
    pub fn with_backoff_step(mut self, backoff_step: Duration) -> Self {
        self.backoff_step = backoff_step;
        self
    }

    /// Produce a validated plan for `question`. Never fails.
    pub async fn plan(&self, question: &str) -> RetrievalPlan {
        let raw = match self.request_plan(question).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "planner failed, using fallback plan");
                return RetrievalPlan::fallback(question);
            }
        };

        match parse_plan(&raw) {
            Some(plan) => {
                tracing::debug!(steps = plan.len(), "planner produced plan");
                plan
            }
            None => {
                tracing::warn!("planner output unusable, using fallback plan");
                RetrievalPlan::fallback(question)
            }
        }
    }

    /// Call the model, retrying transport and model errors.
    async fn request_plan(&self, question: &str) -> AppResult<String> {
        let messages = self.build_messages(question)?;
        let request = LlmRequest::new(self.model.clone(), messages)
            .with_temperature(0.0)
            .with_json_mode();

        let mut attempt: u32 = 0;
        loop {
            match self.llm.complete(&request).await {
                Ok(response) => return Ok(response.content.trim().to_string()),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "planner attempt failed");
                    tokio::time::sleep(self.backoff_step * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn build_messages(&self, question: &str) -> AppResult<Vec<ChatMessage>> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        let built = build_prompt(&self.prompt, variables)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = built.system.as_deref() {
            messages.push(system_message(system));
        }
        messages.push(user_message(&built.user));
        Ok(messages)
    }
}

/// Remove a surrounding markdown code fence, with or without a `json` tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse and validate model output. `None` means the fallback plan applies.
fn parse_plan(raw: &str) -> Option<RetrievalPlan> {
    let parsed: RawPlan = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "planner output is not a plan");
            return None;
        }
    };

    let steps: Vec<RetrievalStep> = parsed
        .steps
        .into_iter()
        .filter_map(|step| match SourceType::parse(&step.source_type) {
            Some(source_type) => Some(RetrievalStep {
                source_type,
                query: step.query,
                reason: step.reason,
            }),
            None => {
                tracing::debug!(source_type = %step.source_type, "dropping step with unknown source type");
                None
            }
        })
        .collect();

    if steps.is_empty() {
        None
    } else {
        Some(RetrievalPlan { steps })
    }
}
