//! Prompt system for Sift.
//!
//! This crate provides the prompts the planner and the reasoning agent send
//! to the chat model:
//! - Built-in definitions compiled into the binary
//! - Optional YAML overrides under `.sift/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use builtin::{builtin_prompt, PLANNER_PROMPT_ID, REASONING_PROMPT_ID};
pub use loader::load_prompt;
pub use types::{BuiltPrompt, PromptDefinition};
