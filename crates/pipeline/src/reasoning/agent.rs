//! Evidence-only reasoning agent.
//!
//! Drives the model ↔ calculator round-trip over the retrieved evidence:
//! sends the conversation, executes any tool calls, appends their results and
//! repeats until the model answers without tools or the round limit is hit.

use super::calculator::evaluate;
use super::citations::extract_citations;
use crate::types::{AnswerResult, RetrievedChunk};
use serde_json::json;
use sift_core::AppResult;
use sift_llm::{
    assistant_message, system_message, tool_message, user_message, ChatMessage, LlmClient,
    LlmRequest, ToolCall, ToolDefinition,
};
use sift_prompt::{build_prompt, PromptDefinition};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Model round-trips allowed before the agent abstains.
pub const MAX_TOOL_ROUNDS: usize = 5;

pub const CALCULATOR_TOOL: &str = "calculator";

pub const NO_EVIDENCE_ANSWER: &str = "No evidence was retrieved. I cannot answer without sources.";
pub const EMPTY_ANSWER: &str = "I could not produce an answer from the evidence.";
pub const CUT_OFF_ANSWER: &str = "Reasoning was cut off after multiple tool rounds.";
pub const UNKNOWN_TOOL: &str = "Unknown tool";

/// Where the loop is after each transition.
#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done(String),
    Abstained,
}

/// Answers questions from evidence, citing sources by id.
pub struct ReasoningAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    max_rounds: usize,
}

impl ReasoningAgent {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
            max_rounds: MAX_TOOL_ROUNDS,
        }
    }

    /// Answer `question` from `evidence`.
    ///
    /// # Errors
    /// Model failures are returned as-is. Hitting the round limit is an
    /// abstention, not an error.
    pub async fn answer(&self, question: &str, evidence: &[RetrievedChunk]) -> AppResult<AnswerResult> {
        if evidence.is_empty() {
            tracing::info!("no evidence retrieved, abstaining without a model call");
            return Ok(AnswerResult::abstain(NO_EVIDENCE_ANSWER, BTreeSet::new()));
        }

        let mut messages = self.build_messages(question, evidence)?;
        let tools = vec![calculator_tool()];
        let mut cited = BTreeSet::new();
        let mut rounds = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel if rounds >= self.max_rounds => LoopState::Abstained,
                LoopState::AwaitingModel => {
                    rounds += 1;
                    let request = LlmRequest::new(self.model.clone(), messages.clone())
                        .with_tools(tools.clone())
                        .with_temperature(0.0);
                    let response = self.llm.complete(&request).await?;

                    let content = response.content.trim().to_string();
                    cited.extend(extract_citations(&content));

                    if !response.has_tool_calls() {
                        LoopState::Done(content)
                    } else {
                        tracing::debug!(
                            round = rounds,
                            tool_count = response.tool_calls.len(),
                            "executing tool calls"
                        );
                        messages.push(assistant_message(&content, response.tool_calls.clone()));
                        LoopState::ExecutingTools(response.tool_calls)
                    }
                }
                LoopState::ExecutingTools(calls) => {
                    for call in &calls {
                        let result = run_tool(call);
                        tracing::debug!(tool = %call.name, call_id = %call.id, result = %result, "tool executed");
                        messages.push(tool_message(&call.id, &result));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(content) => {
                    let answer = if content.is_empty() {
                        EMPTY_ANSWER.to_string()
                    } else {
                        content
                    };
                    tracing::debug!(rounds, cited = cited.len(), "reasoning finished");
                    return Ok(AnswerResult {
                        answer,
                        cited_source_ids: cited,
                        abstained: false,
                    });
                }
                LoopState::Abstained => {
                    tracing::warn!(rounds, "reasoning hit the tool round limit");
                    return Ok(AnswerResult::abstain(CUT_OFF_ANSWER, cited));
                }
            };
        }
    }

    fn build_messages(&self, question: &str, evidence: &[RetrievedChunk]) -> AppResult<Vec<ChatMessage>> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("evidence".to_string(), format_evidence(evidence));
        let built = build_prompt(&self.prompt, variables)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = built.system.as_deref() {
            messages.push(system_message(system));
        }
        messages.push(user_message(&built.user));
        Ok(messages)
    }
}

/// Render evidence as `[Source <id>]` blocks separated by `---`.
pub fn format_evidence(evidence: &[RetrievedChunk]) -> String {
    evidence
        .iter()
        .map(|chunk| format!("[Source {}]\n{}", chunk.source_id, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn calculator_tool() -> ToolDefinition {
    ToolDefinition {
        name: CALCULATOR_TOOL.to_string(),
        description: "Evaluate a mathematical expression. Input a string with numbers and + - * / ** ( ). Use for arithmetic on retrieved numbers.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Math expression, e.g. '2.5 * 10' or '(100 + 50) / 2'"
                }
            },
            "required": ["expression"]
        }),
    }
}

fn run_tool(call: &ToolCall) -> String {
    if call.name != CALCULATOR_TOOL {
        return UNKNOWN_TOOL.to_string();
    }
    // Unparseable arguments behave like an empty object
    let arguments: serde_json::Value =
        serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
    let expression = arguments
        .get("expression")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    evaluate(expression)
}
