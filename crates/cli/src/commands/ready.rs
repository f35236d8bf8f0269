//! Ready command handler.
//!
//! Reports whether a query could be served right now.

use clap::Args;
use sift_core::{config::AppConfig, AppError, AppResult};
use sift_pipeline::{check_ready, AdmissionGate};

/// Check that the chat model and local stores are usable
#[derive(Args, Debug)]
pub struct ReadyCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReadyCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ready command");

        let gate = AdmissionGate::new(config.retrieval.max_concurrent_queries);
        let report = check_ready(config, &gate);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Status: {}", if report.ready { "ready" } else { "not ready" });
            for (name, status) in &report.checks {
                println!("  {:<11} {}", name, status);
            }
            println!("  capacity    {}/{} slots free", report.available, report.capacity);
        }

        if report.ready {
            Ok(())
        } else {
            Err(AppError::NotConfigured("Sift is not ready".to_string()))
        }
    }
}
