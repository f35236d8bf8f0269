//! Reasoning over retrieved evidence: the tool loop, its calculator and citation parsing.

pub mod agent;
pub mod calculator;
pub mod citations;

pub use agent::{format_evidence, ReasoningAgent, MAX_TOOL_ROUNDS};
pub use calculator::evaluate;
pub use citations::extract_citations;
