//! Prompt definitions that ship with the binary.
//!
//! A workspace can replace either of these by writing
//! `.sift/prompts/<id>.yml`; see [`crate::load_prompt`].

use crate::types::PromptDefinition;

/// Identifier of the retrieval planning prompt.
pub const PLANNER_PROMPT_ID: &str = "retrieval.planner";

/// Identifier of the evidence-only answering prompt.
pub const REASONING_PROMPT_ID: &str = "reasoning.answer";

const PLANNER_SYSTEM: &str = r#"You are a retrieval planner for a scientific question answering system. You have access to three source types:
- document: unstructured text (papers, reports already ingested) - use semantic search; your "query" is the search string.
- structured: tabular data (CSV) - use for numbers, tables, datasets; your "query" describes what to look up.
- arxiv: live search on arXiv.org (title, abstract, author, etc.); your "query" is an arXiv search query (e.g. "ti:electron", "all:machine learning", "au:smith"). Use for recent papers or when the question is about published research.

Given a research question, output a JSON object with a "steps" array. Each step has:
- source_type: "document", "structured", or "arxiv"
- query: the search query or lookup description for that source
- reason: one sentence why this step helps answer the question

Use at least one step. Prefer "arxiv" when the question is about finding papers or recent research. Output ONLY valid JSON, no markdown."#;

const PLANNER_TEMPLATE: &str = r#"Research question: {{question}}

Available source types: document, structured, arxiv.

Output your retrieval plan as JSON: {"steps": [{"source_type": "...", "query": "...", "reason": "..."}, ...]}"#;

const REASONING_SYSTEM: &str = "You are a scientific reasoning agent. You must answer the user's question using ONLY the provided evidence. Every claim must be traceable to a cited source, written as [Source <source_id>]. If the evidence is insufficient to answer, say so clearly and do not guess. You have a calculator tool: use it for any arithmetic (e.g. converting units, summing numbers from the evidence). Do not make up numbers.";

const REASONING_TEMPLATE: &str = "Evidence:\n\n{{evidence}}\n\nQuestion: {{question}}";

/// Look up a built-in definition by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let (title, system, template) = match id {
        PLANNER_PROMPT_ID => ("Retrieval planner", PLANNER_SYSTEM, PLANNER_TEMPLATE),
        REASONING_PROMPT_ID => ("Evidence-only answer", REASONING_SYSTEM, REASONING_TEMPLATE),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        system: Some(system.to_string()),
        template: template.to_string(),
    })
}
