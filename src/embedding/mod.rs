//! Embedding generation for semantic search and retrieval.

mod ollama;
mod openai;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingSettings, Provider};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the embedder selected by the settings.
pub fn create_embedder(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> Result<Arc<dyn Embedder>> {
    let timeout = Duration::from_secs(settings.timeout_seconds);
    let endpoint = settings.endpoint_or_default();
    let dimensions = settings.dimensions as usize;

    Ok(match settings.provider {
        Provider::OpenAI => Arc::new(OpenAIEmbedder::with_config(
            &settings.model,
            dimensions,
            api_key,
            &endpoint,
            timeout,
        )?),
        Provider::Ollama => Arc::new(OllamaEmbedder::new(
            &endpoint,
            &settings.model,
            dimensions,
            timeout,
        )?),
    })
}
