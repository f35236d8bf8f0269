//! Ask command handler.
//!
//! Runs one question through the query pipeline and prints the cited answer.

use clap::Args;
use sift_core::{config::AppConfig, AppError, AppResult};
use sift_pipeline::{handle_query, PipelineContext, QueryRequest, QueryResponse};
use std::path::PathBuf;

/// Answer a question from the workspace's evidence sources
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self.get_question()?;
        let context = PipelineContext::from_config(config)?;

        let response = match handle_query(&context, &QueryRequest::new(question)).await {
            Ok(response) => response,
            Err(e) if e.is_rejection() => {
                tracing::warn!("Query rejected: {}", e);
                return Err(e);
            }
            Err(e) => {
                return Err(AppError::Other(format!(
                    "Query failed; please try again. ({})",
                    e
                )))
            }
        };

        if self.json {
            let json = serde_json::to_string_pretty(&response)?;
            println!("{}", json);
        } else {
            print_response(&response);
        }

        Ok(())
    }

    /// Get the question text from the argument or a file.
    fn get_question(&self) -> AppResult<String> {
        if let Some(ref question) = self.question {
            return Ok(question.clone());
        }
        if let Some(ref path) = self.file {
            let text = std::fs::read_to_string(path)?;
            return Ok(text.trim().to_string());
        }
        Err(AppError::InvalidRequest("No question provided".to_string()))
    }
}

fn print_response(response: &QueryResponse) {
    println!("{}", response.answer);
    println!();

    if !response.warning.is_empty() {
        println!("Warning: {}", response.warning);
        println!();
    }

    if response.sources.is_empty() {
        println!("Sources: (none)");
    } else {
        println!("Sources:");
        for source in &response.sources {
            println!(
                "- [{}] {} (score {:.2})",
                source.source_type, source.source_id, source.score
            );
            if !source.excerpt.is_empty() {
                println!("    {}", source.excerpt.replace('\n', " "));
            }
        }
    }

    let latency = &response.latency;
    tracing::debug!(
        "Latency - planning: {}ms, retrieval: {}ms, reasoning: {}ms, total: {}ms",
        latency.planning_ms,
        latency.retrieval_ms,
        latency.reasoning_ms,
        latency.total_ms
    );
}
