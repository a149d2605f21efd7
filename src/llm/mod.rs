//! Language model backends.
//!
//! Generation and feedback talk to a [`LanguageModel`]; the hosted and local backends
//! differ only in transport.

mod ollama;
mod openai;

pub use ollama::OllamaModel;
pub use openai::OpenAIModel;

use crate::config::{LlmSettings, Provider};
use crate::error::{QuizRagError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One prompt sent to a language model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the backend to constrain output to a JSON object.
    pub json_mode: bool,
}

/// Capability shared by all model backends: prompt in, raw text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run the prompt and return the raw completion text.
    async fn complete(&self, request: &ModelRequest) -> Result<String>;

    /// Model identifier, for logging.
    fn name(&self) -> &str;
}

/// Build the model backend selected by the settings.
pub fn create_model(settings: &LlmSettings) -> Result<Arc<dyn LanguageModel>> {
    let timeout = Duration::from_secs(settings.timeout_seconds);
    let endpoint = settings.endpoint_or_default();

    Ok(match settings.provider {
        Provider::OpenAI => Arc::new(OpenAIModel::new(
            &settings.model,
            settings.api_key.as_deref(),
            &endpoint,
            timeout,
        )?),
        Provider::Ollama => Arc::new(OllamaModel::new(&endpoint, &settings.model, timeout)?),
    })
}

/// Run `future`, giving up with [`QuizRagError::Timeout`] once `limit` has passed.
pub async fn with_timeout<T, F>(limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| QuizRagError::Timeout(limit.as_secs()))?
}
