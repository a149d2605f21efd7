//! Locally hosted Ollama backend (`/api/generate`).

use super::{LanguageModel, ModelRequest};
use crate::error::{QuizRagError, Result};
use crate::openai::{create_http_client, endpoint_url};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub struct OllamaModel {
    http: reqwest::Client,
    url: url::Url,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaModel {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: create_http_client(timeout)?,
            url: endpoint_url(endpoint, "api/generate")?,
            model: model.to_string(),
        })
    }
}

fn generate_body<'a>(model: &'a str, request: &'a ModelRequest) -> GenerateRequest<'a> {
    GenerateRequest {
        model,
        prompt: &request.user,
        system: &request.system,
        stream: false,
        format: request.json_mode.then_some("json"),
        options: GenerateOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        },
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &ModelRequest) -> Result<String> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&generate_body(&self.model, request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QuizRagError::Model(format!("Ollama returned {}: {}", status, body)));
        }

        let body: GenerateResponse = response.json().await?;
        debug!("Received {} characters", body.response.len());
        Ok(body.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
