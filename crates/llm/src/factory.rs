//! LLM provider factory.
//!
//! This module creates chat clients from the configured provider name,
//! resolving default endpoints and checking that required secrets are present.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use std::sync::Arc;
use std::time::Duration;

/// Default OpenAI API base.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Groq serves an OpenAI-compatible API under this base.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default local Ollama endpoint.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Groq,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "groq" => Some(Self::Groq),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }
}

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "groq", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required by OpenAI and Groq)
/// * `timeout` - Per-call transport timeout
///
/// # Errors
/// Returns error if the provider is unknown, a required key is missing,
/// or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(OLLAMA_BASE_URL);
            let client = OllamaClient::with_timeout(base_url, timeout)
                .map_err(|e| format!("Failed to create Ollama client: {}", e))?;
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI | ProviderType::Groq => {
            let name = provider_type.as_str();
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| format!("{} provider requires API key", name))?;
            let default_base = if provider_type == ProviderType::Groq {
                GROQ_BASE_URL
            } else {
                OPENAI_BASE_URL
            };
            let client =
                OpenAiClient::new(name, endpoint.unwrap_or(default_base), key, timeout)
                    .map_err(|e| format!("Failed to create {} client: {}", name, e))?;
            Ok(Arc::new(client))
        }
    }
}
