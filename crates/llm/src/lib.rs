//! LLM integration crate for Sift.
//!
//! This crate provides a provider-agnostic abstraction for chat models that
//! support tool calling. The planner and the reasoning agent only see
//! [`LlmClient::complete`], so backends are interchangeable.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI-compatible**: OpenAI and Groq
//!
//! # Example
//! ```no_run
//! use sift_llm::{LlmClient, LlmRequest, user_message, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("llama3.2", vec![user_message("Hello, world!")]);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod message;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, ProviderType};
pub use message::{
    assistant_message, system_message, tool_message, user_message, ChatMessage, Role, ToolCall,
    ToolDefinition,
};
pub use providers::{OllamaClient, OpenAiClient};
