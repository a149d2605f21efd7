//! Embedding-aware view over a single collection.

use super::{IndexedEntry, IndexedSource, SearchHit, VectorStore};
use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{QuizRagError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// A named collection plus the embedder used both to index and to query it.
///
/// Using one embedder for both directions keeps stored and query vectors comparable.
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection: String,
    // Held across embed + replace so concurrent uploads of one source don't interleave.
    write_lock: Mutex<()>,
}

impl VectorIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Create the collection with the embedder's dimensionality if it is missing.
    pub async fn ensure_collection(&self) -> Result<()> {
        self.store
            .ensure_collection(&self.collection, self.embedder.dimensions())
            .await
    }

    /// Embed and store chunks, replacing earlier entries of the same sources.
    ///
    /// Any embedding or storage failure aborts the whole batch and leaves the
    /// previous entries of those sources in place.
    #[instrument(skip(self, chunks), fields(collection = %self.collection, count = chunks.len()))]
    pub async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        self.ensure_collection().await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(QuizRagError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        let entries = chunks
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                check_dimensions(&embedding, dimensions)?;
                Ok(IndexedEntry::new(chunk, embedding))
            })
            .collect::<Result<Vec<_>>>()?;

        let stored = self.store.replace_sources(&self.collection, &entries).await?;
        info!("Indexed {} chunks into {}", stored, self.collection);
        Ok(stored)
    }

    /// Embed a query with the index's embedder.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedding = self.embedder.embed(query).await?;
        check_dimensions(&embedding, self.embedder.dimensions())?;
        Ok(embedding)
    }

    /// Search with an already computed query vector.
    pub async fn search_vector(
        &self,
        query_embedding: &[f32],
        k: usize,
        topic: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        self.store
            .search(&self.collection, query_embedding, k, topic)
            .await
    }

    /// Nearest chunks to `query`, optionally restricted to one topic.
    ///
    /// An empty or missing collection gives no hits.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn search(&self, query: &str, k: usize, topic: Option<&str>) -> Result<Vec<SearchHit>> {
        if self.store.count(&self.collection).await? == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embed_query(query).await?;
        self.search_vector(&embedding, k, topic).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.collection).await
    }

    pub async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        self.store.list_sources(&self.collection).await
    }

    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }
}

fn check_dimensions(embedding: &[f32], expected: usize) -> Result<()> {
    if embedding.len() != expected {
        return Err(QuizRagError::Embedding(format!(
            "Embedding model returned {} dimensions, index expects {}",
            embedding.len(),
            expected
        )));
    }
    Ok(())
}
