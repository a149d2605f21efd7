//! Ollama embeddings implementation for locally hosted models.

use super::Embedder;
use crate::error::{QuizRagError, Result};
use crate::openai::{create_http_client, endpoint_url};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Requests in flight at once during batch embedding.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Embedder backed by an Ollama server (`/api/embeddings`).
pub struct OllamaEmbedder {
    http: reqwest::Client,
    url: url::Url,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create an embedder for `model` served at `endpoint`.
    pub fn new(endpoint: &str, model: &str, dimensions: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: create_http_client(timeout)?,
            url: endpoint_url(endpoint, "api/embeddings")?,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(QuizRagError::Embedding("Empty embedding response".to_string()));
        }
        Ok(body.embedding)
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Generating embeddings for {} texts", texts.len());

        // Built up front so the stream holds no closure over borrowed texts.
        // `buffered` keeps results in input order.
        let requests: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        futures::stream::iter(requests)
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
