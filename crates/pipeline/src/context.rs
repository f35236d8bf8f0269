//! Shared pipeline state, built once at startup.
//!
//! Collaborator clients are held behind `Arc` and only read after
//! construction. The admission gate is the one piece of state shared
//! mutably across requests.

use crate::admission::AdmissionGate;
use crate::executor::{RetrievalExecutor, Retrievers};
use crate::planner::RetrievalPlanner;
use crate::reasoning::ReasoningAgent;
use sift_core::{AppConfig, AppError, AppResult};
use sift_knowledge::{
    create_provider, ArxivClient, CsvTableReader, SqliteMetadataStore, SqliteVectorIndex,
};
use sift_llm::{create_client, LlmClient};
use sift_prompt::{load_prompt, PromptDefinition, PLANNER_PROMPT_ID, REASONING_PROMPT_ID};
use std::sync::Arc;
use std::time::Duration;

/// Planner and agent, present only when a chat model is configured.
pub(crate) struct ChatStages {
    pub(crate) planner: RetrievalPlanner,
    pub(crate) agent: ReasoningAgent,
}

/// Everything a query needs, shared across requests.
pub struct PipelineContext {
    pub(crate) chat: Option<ChatStages>,
    pub(crate) executor: RetrievalExecutor,
    pub(crate) gate: AdmissionGate,
}

impl PipelineContext {
    /// Context with retrieval wired but no chat model; queries are rejected
    /// until [`PipelineContext::with_chat_model`] is applied.
    pub fn new(retrievers: Retrievers, max_concurrent_queries: usize) -> Self {
        Self {
            chat: None,
            executor: RetrievalExecutor::new(retrievers),
            gate: AdmissionGate::new(max_concurrent_queries),
        }
    }

    /// Attach the chat model used by the planner and the reasoning agent.
    pub fn with_chat_model(
        mut self,
        llm: Arc<dyn LlmClient>,
        model: &str,
        planner_prompt: PromptDefinition,
        reasoning_prompt: PromptDefinition,
        max_retries: u32,
    ) -> Self {
        self.chat = Some(ChatStages {
            planner: RetrievalPlanner::new(Arc::clone(&llm), model, planner_prompt, max_retries),
            agent: ReasoningAgent::new(llm, model, reasoning_prompt),
        });
        self
    }

    /// Change the planner's retry backoff unit. No effect without a chat model.
    pub fn with_planner_backoff(mut self, backoff_step: Duration) -> Self {
        if let Some(chat) = self.chat.take() {
            self.chat = Some(ChatStages {
                planner: chat.planner.with_backoff_step(backoff_step),
                agent: chat.agent,
            });
        }
        self
    }

    /// Build the context from workspace configuration.
    ///
    /// A missing or unusable chat model leaves the context in the
    /// not-configured state instead of failing, so readiness and rejection
    /// reporting still work.
    ///
    /// # Errors
    /// Fails when the local stores cannot be opened or an HTTP client cannot
    /// be built.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.ensure_sift_dir()?;
        let settings = &config.retrieval;

        let retrievers = Retrievers {
            embedder: match create_provider(
                &config.embeddings,
                config.resolve_api_key("openai").as_deref(),
            ) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    tracing::warn!(error = %e, "embeddings unavailable, document search disabled");
                    None
                }
            },
            vectors: Arc::new(SqliteVectorIndex::open(&config.index_path())?),
            metadata: Arc::new(SqliteMetadataStore::open(&config.sources_db_path())?),
            tables: Arc::new(CsvTableReader::new()),
            papers: Arc::new(ArxivClient::new()?),
            top_k_docs: settings.top_k_docs,
            arxiv_max_results: settings.arxiv_max_results,
            arxiv_timeout: Duration::from_secs(settings.arxiv_timeout_secs),
        };

        let context = Self::new(retrievers, settings.max_concurrent_queries);

        if !config.has_llm_configured() {
            tracing::warn!(provider = %config.provider, "no chat model configured, queries will be rejected");
            return Ok(context);
        }

        let api_key = config.resolve_api_key(&config.provider);
        let endpoint = config.resolve_endpoint(&config.provider);
        let llm = match create_client(
            &config.provider,
            endpoint.as_deref(),
            api_key.as_deref(),
            Duration::from_secs(settings.llm_timeout_secs),
        ) {
            Ok(llm) => llm,
            Err(e) => {
                tracing::warn!(error = %e, "chat model unavailable, queries will be rejected");
                return Ok(context);
            }
        };

        let planner_prompt = load_prompt(&config.workspace, PLANNER_PROMPT_ID)?;
        let reasoning_prompt = load_prompt(&config.workspace, REASONING_PROMPT_ID)?;

        tracing::debug!(provider = llm.provider_name(), model = %config.model, "chat model ready");
        Ok(context.with_chat_model(
            llm,
            &config.model,
            planner_prompt,
            reasoning_prompt,
            settings.max_retries,
        ))
    }

    /// Whether a chat model is attached.
    pub fn has_chat_model(&self) -> bool {
        self.chat.is_some()
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub(crate) fn chat_stages(&self) -> AppResult<&ChatStages> {
        self.chat.as_ref().ok_or_else(|| {
            AppError::NotConfigured(
                "set SIFT_API_KEY, OPENAI_API_KEY or GROQ_API_KEY, or use the ollama provider."
                    .to_string(),
            )
        })
    }
}
