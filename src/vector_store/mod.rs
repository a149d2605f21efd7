//! Vector store abstraction for QuizRag.
//!
//! Provides a trait-based interface for different vector database backends, plus the
//! [`VectorIndex`] that pairs a store with an embedder.

mod index;
mod memory;
mod sqlite;

pub use index::VectorIndex;
pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A chunk stored in the vector database together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// The indexed chunk.
    pub chunk: Chunk,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this entry was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexedEntry {
    /// Create a new entry with a fresh ID.
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search hit with score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Summary information about an indexed source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source path or identifier.
    pub source: String,
    /// Topic of the source.
    pub topic: String,
    /// Number of indexed chunks.
    pub chunk_count: usize,
    /// When the source was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
///
/// Entries live in named collections with a fixed dimensionality and cosine distance.
/// Implementations serialise writes internally, so concurrent callers are safe.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if absent. Fails if it exists with another dimensionality.
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()>;

    /// Dimensionality of a collection, or `None` if it does not exist.
    async fn collection_dimensions(&self, collection: &str) -> Result<Option<usize>>;

    /// Bulk insert entries. All of them are written or none.
    async fn upsert_batch(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize>;

    /// Drop every entry of the sources present in `entries`, then insert `entries`.
    ///
    /// One atomic step: on failure the previous entries of those sources are kept.
    async fn replace_sources(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize>;

    /// Nearest entries first, optionally restricted to one topic.
    ///
    /// A missing collection yields no hits rather than an error.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        topic: Option<&str>,
    ) -> Result<Vec<SearchHit>>;

    /// Delete all entries of one source.
    async fn delete_by_source(&self, collection: &str, source: &str) -> Result<usize>;

    /// List indexed sources.
    async fn list_sources(&self, collection: &str) -> Result<Vec<IndexedSource>>;

    /// Get total entry count of a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Persist pending writes before shutdown.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Distinct sources of a batch, in order.
pub(crate) fn distinct_sources(entries: &[IndexedEntry]) -> BTreeSet<&str> {
    entries.iter().map(|e| e.chunk.source.as_str()).collect()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort hits by descending score, breaking ties by position in the source.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.source.cmp(&b.chunk.source))
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    hits.truncate(limit);
    hits
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::chunking::DocType;

    pub fn entry(source: &str, index: usize, topic: &str, embedding: Vec<f32>) -> IndexedEntry {
        IndexedEntry::new(
            Chunk {
                content: format!("{} chunk {}", source, index),
                source: source.to_string(),
                chunk_index: index,
                doc_type: DocType::Text,
                topic: topic.to_string(),
            },
            embedding,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::entry;
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_hits_orders_and_truncates() {
        let hits = vec![
            SearchHit { chunk: entry("b.txt", 0, "General", vec![]).chunk, score: 0.5 },
            SearchHit { chunk: entry("a.txt", 1, "General", vec![]).chunk, score: 0.9 },
            SearchHit { chunk: entry("a.txt", 0, "General", vec![]).chunk, score: 0.5 },
        ];
        let ranked = rank_hits(hits, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk.chunk_index, 1);
        assert_eq!(ranked[1].chunk.source, "a.txt");
    }
}
