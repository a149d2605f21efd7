//! OpenAI client configuration with sensible defaults.

use crate::error::{QuizRagError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client with a finite request timeout.
///
/// Without an explicit key the client falls back to `OPENAI_API_KEY`.
pub fn create_client(
    api_key: Option<&str>,
    api_base: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| QuizRagError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_base(api_base);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Create a plain HTTP client with a finite request timeout.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| QuizRagError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Join a path onto a base URL, tolerating a missing trailing slash on the base.
pub fn endpoint_url(base: &str, path: &str) -> Result<url::Url> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    url::Url::parse(&normalized)
        .and_then(|u| u.join(path.trim_start_matches('/')))
        .map_err(|e| QuizRagError::Config(format!("Invalid endpoint '{}': {}", base, e)))
}
