//! Embedding providers for document search.
//!
//! The same provider must be used at ingestion and at query time; the
//! active one comes from the `embeddings` section of the workspace config.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
