//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, distinct_sources, rank_hits, IndexedEntry, IndexedSource, SearchHit, VectorStore};
use crate::error::{QuizRagError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Collection {
    dimensions: usize,
    entries: Vec<IndexedEntry>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|e| QuizRagError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|e| QuizRagError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

/// Look up a collection and check the batch against its dimensionality.
fn checked_target<'a>(
    collections: &'a mut HashMap<String, Collection>,
    collection: &str,
    entries: &[IndexedEntry],
) -> Result<&'a mut Collection> {
    let target = collections.get_mut(collection).ok_or_else(|| {
        QuizRagError::VectorStore(format!("Collection '{}' does not exist", collection))
    })?;

    if let Some(bad) = entries.iter().find(|e| e.embedding.len() != target.dimensions) {
        return Err(QuizRagError::VectorStore(format!(
            "Embedding has {} dimensions, collection '{}' expects {}",
            bad.embedding.len(),
            collection,
            target.dimensions
        )));
    }
    Ok(target)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.write()?;
        match collections.get(collection) {
            Some(existing) if existing.dimensions != dimensions => {
                Err(QuizRagError::VectorStore(format!(
                    "Collection '{}' holds {}-dimensional vectors but the embedder produces {}",
                    collection, existing.dimensions, dimensions
                )))
            }
            Some(_) => Ok(()),
            None => {
                collections.insert(
                    collection.to_string(),
                    Collection {
                        dimensions,
                        entries: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn collection_dimensions(&self, collection: &str) -> Result<Option<usize>> {
        Ok(self.read()?.get(collection).map(|c| c.dimensions))
    }

    async fn upsert_batch(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize> {
        let mut collections = self.write()?;
        let target = checked_target(&mut collections, collection, entries)?;

        for entry in entries {
            target.entries.retain(|e| e.id != entry.id);
            target.entries.push(entry.clone());
        }
        Ok(entries.len())
    }

    async fn replace_sources(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize> {
        let mut collections = self.write()?;
        let target = checked_target(&mut collections, collection, entries)?;

        let sources = distinct_sources(entries);
        target
            .entries
            .retain(|e| !sources.contains(e.chunk.source.as_str()));
        target.entries.extend(entries.iter().cloned());
        Ok(entries.len())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        topic: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let collections = self.read()?;
        let Some(target) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        if query_embedding.len() != target.dimensions {
            return Err(QuizRagError::VectorStore(format!(
                "Query embedding has {} dimensions, collection '{}' expects {}",
                query_embedding.len(),
                collection,
                target.dimensions
            )));
        }

        let hits = target
            .entries
            .iter()
            .filter(|e| topic.map_or(true, |t| e.chunk.topic == t))
            .map(|e| SearchHit {
                chunk: e.chunk.clone(),
                score: cosine_similarity(query_embedding, &e.embedding),
            })
            .collect();

        Ok(rank_hits(hits, limit))
    }

    async fn delete_by_source(&self, collection: &str, source: &str) -> Result<usize> {
        let mut collections = self.write()?;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let initial_len = target.entries.len();
        target.entries.retain(|e| e.chunk.source != source);
        Ok(initial_len - target.entries.len())
    }

    async fn list_sources(&self, collection: &str) -> Result<Vec<IndexedSource>> {
        let collections = self.read()?;
        let Some(target) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut sources: BTreeMap<&str, IndexedSource> = BTreeMap::new();
        for entry in &target.entries {
            let info = sources
                .entry(entry.chunk.source.as_str())
                .or_insert_with(|| IndexedSource {
                    source: entry.chunk.source.clone(),
                    topic: entry.chunk.topic.clone(),
                    chunk_count: 0,
                    indexed_at: entry.indexed_at,
                });
            info.chunk_count += 1;
            if entry.indexed_at > info.indexed_at {
                info.indexed_at = entry.indexed_at;
            }
        }

        Ok(sources.into_values().collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .read()?
            .get(collection)
            .map(|c| c.entries.len())
            .unwrap_or(0))
    }
}
