//! Vector search abstraction for document chunks.

use crate::types::VectorHit;
use sift_core::AppResult;

/// Trait for vector search backends.
///
/// Results are ordered by ascending distance and hold at most `top_k`
/// entries. Each hit's metadata carries the `source_id` of the document it
/// was cut from.
#[async_trait::async_trait]
pub trait VectorSearch: Send + Sync {
    /// Return the nearest chunks to `embedding`.
    async fn query(&self, embedding: &[f32], top_k: usize) -> AppResult<Vec<VectorHit>>;
}
