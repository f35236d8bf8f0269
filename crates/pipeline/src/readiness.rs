//! Readiness checks for the chat model, embeddings and local stores.
//!
//! Details never include secrets, only `ok`, `not_configured` or a short error.

use crate::admission::AdmissionGate;
use serde::Serialize;
use sift_core::AppConfig;
use sift_knowledge::{create_provider, SqliteMetadataStore, SqliteVectorIndex};
use std::collections::BTreeMap;

pub const CHECK_OK: &str = "ok";
pub const NOT_CONFIGURED: &str = "not_configured";

/// Outcome of a readiness check.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub checks: BTreeMap<String, String>,
    pub capacity: usize,
    pub available: usize,
}

/// Probe each dependency.
///
/// Ready means the chat model, metadata store and vector index are usable.
/// Embeddings are reported but optional: arXiv and table retrieval work
/// without them.
pub fn check_ready(config: &AppConfig, gate: &AdmissionGate) -> ReadinessReport {
    let mut checks = BTreeMap::new();

    let llm = if config.has_llm_configured() {
        CHECK_OK.to_string()
    } else {
        NOT_CONFIGURED.to_string()
    };
    checks.insert("llm".to_string(), llm);

    let embeddings = match create_provider(
        &config.embeddings,
        config.resolve_api_key("openai").as_deref(),
    ) {
        Ok(_) => CHECK_OK.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness: embeddings unavailable");
            NOT_CONFIGURED.to_string()
        }
    };
    checks.insert("embeddings".to_string(), embeddings);

    let db = match config
        .ensure_sift_dir()
        .and_then(|_| SqliteMetadataStore::open(&config.sources_db_path()))
        .and_then(|store| store.data_version())
    {
        Ok(_) => CHECK_OK.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness: metadata store failed");
            format!("error: {}", e)
        }
    };
    checks.insert("db".to_string(), db);

    let index = match config
        .ensure_sift_dir()
        .and_then(|_| SqliteVectorIndex::open(&config.index_path()))
        .and_then(|index| index.count())
    {
        Ok(_) => CHECK_OK.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness: vector index failed");
            format!("error: {}", e)
        }
    };
    checks.insert("index".to_string(), index);

    let ready = ["llm", "db", "index"]
        .iter()
        .all(|key| checks.get(*key).map(String::as_str) == Some(CHECK_OK));

    ReadinessReport {
        ready,
        checks,
        capacity: gate.capacity(),
        available: gate.available(),
    }
}
