//! Ingest command handler.
//!
//! Fills the local stores: documents and arXiv papers go into the vector
//! index, CSV tables are registered as structured sources.

use clap::{ArgGroup, Args, Subcommand};
use sift_core::{config::AppConfig, AppResult};
use sift_knowledge::{
    create_provider, ingest_documents, ingest_papers, register_table, ArxivClient, ChunkOptions,
    IngestStats, Paper, SqliteMetadataStore, SqliteVectorIndex,
};
use std::path::PathBuf;
use std::time::Duration;

/// Add documents or tables to the workspace
#[derive(Args, Debug)]
pub struct IngestCommand {
    #[command(subcommand)]
    pub action: IngestAction,
}

#[derive(Subcommand, Debug)]
pub enum IngestAction {
    /// Chunk, embed and index documents (markdown, HTML, plain text, PDF)
    Docs(IngestDocsCommand),
    /// Register a CSV file as a structured source
    Table(IngestTableCommand),
    /// Fetch arXiv papers and index their title and abstract
    Arxiv(IngestArxivCommand),
}

/// Ingest documents
#[derive(Args, Debug)]
pub struct IngestDocsCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Characters per chunk (default from config)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Overlap between chunks (default from config)
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestDocsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest docs command for {} path(s)", self.paths.len());

        let embedder = create_provider(
            &config.embeddings,
            config.resolve_api_key("openai").as_deref(),
        )?;
        let index = SqliteVectorIndex::open(&config.index_path())?;
        let store = SqliteMetadataStore::open(&config.sources_db_path())?;
        let options = ChunkOptions {
            chunk_size: self.chunk_size.unwrap_or(config.retrieval.chunk_size),
            chunk_overlap: self.chunk_overlap.unwrap_or(config.retrieval.chunk_overlap),
        };

        let stats = ingest_documents(&self.paths, embedder.as_ref(), &index, &store, options).await?;
        print_stats(&stats, "documents", self.json)
    }
}

/// Ingest arXiv papers
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .multiple(true)
        .args(["query", "id_list"])
))]
pub struct IngestArxivCommand {
    /// arXiv search query (e.g. "ti:transformer", "all:graphene")
    #[arg(long)]
    pub query: Option<String>,

    /// Comma-separated arXiv ids (e.g. "2301.00001,hep-th/9901001")
    #[arg(long)]
    pub id_list: Option<String>,

    /// Maximum papers to fetch
    #[arg(long, default_value_t = 20)]
    pub max_results: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestArxivCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest arxiv command");

        let client = ArxivClient::new()?;
        let papers = client
            .fetch(
                self.query.as_deref(),
                self.id_list.as_deref(),
                self.max_results,
                Duration::from_secs(config.retrieval.arxiv_timeout_secs),
            )
            .await?;

        let stats = store_papers(config, &papers).await?;
        print_stats(&stats, "papers", self.json)
    }
}

/// Embed and register fetched papers in the workspace stores.
async fn store_papers(config: &AppConfig, papers: &[Paper]) -> AppResult<IngestStats> {
    let embedder = create_provider(
        &config.embeddings,
        config.resolve_api_key("openai").as_deref(),
    )?;
    let index = SqliteVectorIndex::open(&config.index_path())?;
    let store = SqliteMetadataStore::open(&config.sources_db_path())?;
    ingest_papers(papers, embedder.as_ref(), &index, &store).await
}

fn print_stats(stats: &IngestStats, noun: &str, json: bool) -> AppResult<()> {
    if json {
        let output = serde_json::json!({
            "sourcesCount": stats.sources_count,
            "chunksCount": stats.chunks_count,
            "bytesProcessed": stats.bytes_processed,
            "skipped": stats.skipped,
            "durationSecs": stats.duration_secs,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Ingested {} {} ({} chunks, {} bytes) in {:.2}s",
            stats.sources_count,
            noun,
            stats.chunks_count,
            stats.bytes_processed,
            stats.duration_secs
        );
        for skipped in &stats.skipped {
            println!("  skipped: {}", skipped);
        }
    }
    Ok(())
}

/// Register a table
#[derive(Args, Debug)]
pub struct IngestTableCommand {
    /// CSV file to register
    pub path: PathBuf,

    /// Display title (default: file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestTableCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest table command for {:?}", self.path);

        let store = SqliteMetadataStore::open(&config.sources_db_path())?;
        let tables_dir = config.sift_dir().join("tables");
        let record = register_table(&self.path, self.title.as_deref(), &tables_dir, &store)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            println!("Registered table '{}' as {}", record.title, record.source_id);
        }

        Ok(())
    }
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IngestAction::Docs(cmd) => cmd.execute(config).await,
            IngestAction::Table(cmd) => cmd.execute(config).await,
            IngestAction::Arxiv(cmd) => cmd.execute(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sift_knowledge::ARXIV_SOURCE;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Parser, Debug)]
    struct IngestCli {
        #[command(subcommand)]
        action: IngestAction,
    }

    fn workspace_config(temp: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();
        config.ensure_sift_dir().unwrap();
        config
    }

    #[tokio::test]
    async fn test_ingest_docs_then_list() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("notes.md"), "# Graphene\n\nGraphene conducts heat well.").unwrap();

        let cmd = IngestDocsCommand {
            paths: vec![docs],
            chunk_size: None,
            chunk_overlap: None,
            json: true,
        };
        cmd.execute(&config).await.unwrap();

        let store = SqliteMetadataStore::open(&config.sources_db_path()).unwrap();
        assert_eq!(store.sources_by_type("document").unwrap().len(), 1);
        let index = SqliteVectorIndex::open(&config.index_path()).unwrap();
        assert!(index.count().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_ingest_table() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);
        let csv = temp.path().join("plants.csv");
        fs::write(&csv, "plant,output_mw\nA,120\nB,80\n").unwrap();

        let cmd = IngestTableCommand {
            path: csv,
            title: Some("Power plants".to_string()),
            json: false,
        };
        cmd.execute(&config).await.unwrap();

        let store = SqliteMetadataStore::open(&config.sources_db_path()).unwrap();
        let tables = store.sources_by_type("structured").unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].title, "Power plants");
        assert!(tables[0].metadata_str("table_path").is_some());
    }

    #[test]
    fn test_arxiv_requires_query_or_ids() {
        assert!(IngestCli::try_parse_from(["sift", "arxiv"]).is_err());

        let cli = IngestCli::try_parse_from([
            "sift",
            "arxiv",
            "--id-list",
            "2301.00001,hep-th/9901001",
            "--max-results",
            "5",
        ])
        .unwrap();
        match cli.action {
            IngestAction::Arxiv(cmd) => {
                assert_eq!(cmd.id_list.as_deref(), Some("2301.00001,hep-th/9901001"));
                assert!(cmd.query.is_none());
                assert_eq!(cmd.max_results, 5);
            }
            other => panic!("unexpected action: {:?}", other),
        }

        let cli = IngestCli::try_parse_from(["sift", "arxiv", "--query", "ti:graphene"]).unwrap();
        assert!(matches!(cli.action, IngestAction::Arxiv(ref cmd) if cmd.max_results == 20));
    }

    #[tokio::test]
    async fn test_store_papers_registers_arxiv_sources() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);
        let papers = vec![Paper {
            id: "hep-th/9901001v1".to_string(),
            title: "String dualities".to_string(),
            abstract_text: "We relate two theories.".to_string(),
            authors: vec!["Ada Lovelace".to_string()],
            link: "http://arxiv.org/abs/hep-th/9901001v1".to_string(),
        }];

        let stats = store_papers(&config, &papers).await.unwrap();
        assert_eq!(stats.chunks_count, 1);

        let store = SqliteMetadataStore::open(&config.sources_db_path()).unwrap();
        let sources = store.sources_by_type(ARXIV_SOURCE).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_id, "hep-th_9901001v1");
        let index = SqliteVectorIndex::open(&config.index_path()).unwrap();
        assert_eq!(index.count().unwrap(), 1);
    }
}
