//! Sift query pipeline.
//!
//! A question passes through three stages:
//! - [`RetrievalPlanner`]: one model call turns it into retrieval steps
//! - [`RetrievalExecutor`]: steps run concurrently against their sources
//! - [`ReasoningAgent`]: a bounded calculator tool loop answers from the evidence
//!
//! [`handle_query`] wraps the stages with request validation, the
//! [`AdmissionGate`] and response assembly.

pub mod admission;
pub mod context;
pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod readiness;
pub mod reasoning;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use admission::{AdmissionGate, AdmissionSlot};
pub use context::PipelineContext;
pub use executor::{dedup_chunks, RetrievalExecutor, Retrievers};
pub use pipeline::handle_query;
pub use planner::RetrievalPlanner;
pub use readiness::{check_ready, ReadinessReport};
pub use reasoning::{evaluate, extract_citations, ReasoningAgent, MAX_TOOL_ROUNDS};
pub use types::{
    AnswerResult, CitedSource, LatencyBreakdown, QueryRequest, QueryResponse, RetrievalPlan,
    RetrievalStep, RetrievedChunk, SourceType,
};
