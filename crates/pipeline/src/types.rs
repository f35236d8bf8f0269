//! Pipeline data model: plans, evidence, answers and the request boundary.

use serde::{Deserialize, Serialize};
use sift_core::{AppError, AppResult};
use std::collections::BTreeSet;
use std::fmt;

/// Longest question accepted at the request boundary, in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;

/// Warning attached to responses whose answer abstained.
pub const ABSTAIN_WARNING: &str = "Insufficient evidence; answer may be incomplete.";

/// The closed set of evidence categories a plan can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Document,
    Structured,
    Arxiv,
}

impl SourceType {
    pub const ALL: [SourceType; 3] = [Self::Document, Self::Structured, Self::Arxiv];

    /// Parse a source type tag. Tags are matched exactly.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "document" => Some(Self::Document),
            "structured" => Some(Self::Structured),
            "arxiv" => Some(Self::Arxiv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Structured => "structured",
            Self::Arxiv => "arxiv",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned retrieval against a single source category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalStep {
    pub source_type: SourceType,
    pub query: String,
    pub reason: String,
}

/// Ordered retrieval steps for one question. Never empty once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalPlan {
    pub steps: Vec<RetrievalStep>,
}

impl RetrievalPlan {
    /// The plan used whenever planning fails: a single document search for the question.
    pub fn fallback(question: &str) -> Self {
        Self {
            steps: vec![RetrievalStep {
                source_type: SourceType::Document,
                query: question.to_string(),
                reason: "fallback".to_string(),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A unit of evidence returned by a retrieval step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub source_id: String,
    pub source_type: SourceType,
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// What the reasoning agent concluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub cited_source_ids: BTreeSet<String>,
    pub abstained: bool,
}

impl AnswerResult {
    pub fn abstain(answer: &str, cited_source_ids: BTreeSet<String>) -> Self {
        Self {
            answer: answer.to_string(),
            cited_source_ids,
            abstained: true,
        }
    }
}

/// A question submitted to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }

    /// Check the question length (1 to 2000 characters).
    pub fn validate(&self) -> AppResult<()> {
        let chars = self.question.chars().count();
        if chars == 0 {
            return Err(AppError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        if chars > MAX_QUESTION_CHARS {
            return Err(AppError::InvalidRequest(format!(
                "question must be at most {} characters (got {})",
                MAX_QUESTION_CHARS, chars
            )));
        }
        Ok(())
    }
}

/// A source cited in the final answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedSource {
    pub source_id: String,
    pub source_type: SourceType,
    pub excerpt: String,
    pub score: f64,
}

/// Wall-clock time spent per stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyBreakdown {
    pub planning_ms: f64,
    pub retrieval_ms: f64,
    pub reasoning_ms: f64,
    pub total_ms: f64,
}

/// The user-facing answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<CitedSource>,
    pub latency: LatencyBreakdown,
    pub abstained: bool,
    /// Empty unless the answer abstained
    #[serde(default)]
    pub warning: String,
}
