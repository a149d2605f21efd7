//! Context building for question generation.

use crate::error::Result;
use crate::vector_store::{SearchHit, VectorIndex};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of chunks retrieved per topic.
pub const DEFAULT_K: usize = 5;

/// Builds a prompt context block for a topic from the vector index.
pub struct Retriever {
    index: Arc<VectorIndex>,
    k: usize,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index, k: DEFAULT_K }
    }

    /// Set the number of retrieved chunks.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Search query used to find material for a topic.
    pub fn query_for(topic: &str) -> String {
        format!(
            "Topic: {}. Generate exam-style multiple choice questions about {}",
            topic, topic
        )
    }

    /// Retrieve hits for a topic.
    ///
    /// Entries tagged with exactly this topic are preferred. If none match, the search is
    /// repeated over the whole collection since requested topics are free text.
    pub async fn retrieve(&self, topic: &str) -> Result<Vec<SearchHit>> {
        if self.index.count().await? == 0 {
            debug!("Index is empty, no context for {}", topic);
            return Ok(Vec::new());
        }

        let embedding = self.index.embed_query(&Self::query_for(topic)).await?;

        let hits = self.index.search_vector(&embedding, self.k, Some(topic)).await?;
        if !hits.is_empty() {
            return Ok(hits);
        }

        debug!("No entries tagged {}, searching all topics", topic);
        self.index.search_vector(&embedding, self.k, None).await
    }

    /// Formatted context for a topic. Empty when nothing is found or retrieval fails.
    pub async fn get_context(&self, topic: &str) -> String {
        match self.retrieve(topic).await {
            Ok(hits) => {
                info!("Retrieved {} context chunks for {}", hits.len(), topic);
                format_context_for_prompt(&hits)
            }
            Err(e) => {
                warn!("Context retrieval failed for {}: {}", topic, e);
                String::new()
            }
        }
    }
}

/// Number the hits and separate them with blank lines.
pub fn format_context_for_prompt(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("Context {}:\n{}", i + 1, hit.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format hits for display to the user.
pub fn format_context_for_display(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "• {} #{} [{}] (score: {:.2})\n  {}",
                hit.chunk.source,
                hit.chunk.chunk_index,
                hit.chunk.topic,
                hit.score,
                truncate(&hit.chunk.content, 200)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
