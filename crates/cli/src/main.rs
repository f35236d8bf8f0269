//! Sift CLI
//!
//! Main entry point for the sift command-line tool.
//! Answers questions from local documents, registered tables and arXiv,
//! citing the evidence it used.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, ReadyCommand, SourcesCommand};
use sift_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};
use std::path::PathBuf;

/// Sift - planned, multi-source, evidence-only question answering
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Planned, multi-source, evidence-only question answering", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SIFT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log line format (pretty, json)
    #[arg(long, global = true, env = "SIFT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Chat provider (openai, groq, ollama)
    #[arg(short, long, global = true, env = "SIFT_PROVIDER")]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "SIFT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the workspace's evidence sources
    Ask(AskCommand),

    /// Add documents or tables to the workspace
    Ingest(IngestCommand),

    /// Inspect registered sources
    Sources(SourcesCommand),

    /// Check that the chat model and local stores are usable
    Ready(ReadyCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from the workspace, config file and environment
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let mut config = config.with_overrides(
        None,
        None,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    if let Some(format) = cli.log_format {
        config.log_format = Some(format);
    }

    // Initialize logging with final configuration
    let log_format = LogFormat::parse(config.log_format.as_deref().unwrap_or("pretty"));
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    config.validate()?;

    tracing::info!("Sift CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // Ensure .sift directory exists
    config.ensure_sift_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Ingest(_) => "ingest",
        Commands::Sources(_) => "sources",
        Commands::Ready(_) => "ready",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Sources(cmd) => cmd.execute(&config).await,
        Commands::Ready(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
