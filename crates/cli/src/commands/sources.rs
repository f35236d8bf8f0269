//! Sources command handler.

use clap::{Args, Subcommand};
use sift_core::{config::AppConfig, AppResult};
use sift_knowledge::SqliteMetadataStore;

/// Inspect registered sources
#[derive(Args, Debug)]
pub struct SourcesCommand {
    #[command(subcommand)]
    pub action: SourcesAction,
}

#[derive(Subcommand, Debug)]
pub enum SourcesAction {
    /// List registered documents and tables
    List {
        /// Only show one source type (document, structured, arxiv)
        #[arg(long = "type")]
        source_type: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl SourcesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            SourcesAction::List { source_type, json } => {
                tracing::info!("Listing sources");
                let store = SqliteMetadataStore::open(&config.sources_db_path())?;
                let sources = match source_type {
                    Some(t) => store.sources_by_type(t)?,
                    None => store.all_sources()?,
                };

                if *json {
                    println!("{}", serde_json::to_string_pretty(&sources)?);
                    return Ok(());
                }

                if sources.is_empty() {
                    println!("No sources registered. Use `sift ingest docs` or `sift ingest table`.");
                    return Ok(());
                }

                println!("{:<18} {:<11} {:<25} TITLE", "ID", "TYPE", "INGESTED");
                for source in &sources {
                    println!(
                        "{:<18} {:<11} {:<25} {}",
                        source.source_id, source.source_type, source.ingested_at, source.title
                    );
                }
                println!("\n{} source(s)", sources.len());
                Ok(())
            }
        }
    }
}
