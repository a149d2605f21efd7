//! Question generation: context assembly, prompting and tolerant parsing.

use super::{parse_response, McqRecord, ParseOutcome, RepairedField};
use crate::config::Prompts;
use crate::literature::LiteratureSource;
use crate::llm::{with_timeout, LanguageModel, ModelRequest};
use crate::rag::Retriever;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Context placeholder used when neither retrieval nor literature produced anything.
const NO_CONTEXT: &str =
    "No study material is available for this topic. Use well-established general knowledge.";

/// Everything produced while generating one question.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub record: McqRecord,
    /// Fields that were repaired in the model's output.
    pub repairs: Vec<RepairedField>,
    /// True when the templated question was returned instead of model output.
    pub used_fallback: bool,
    /// Combined context sent to the model.
    pub context: String,
}

/// Join retrieved and literature context under section labels, omitting empty sections.
pub fn combine_contexts(retrieved: &str, literature: &str) -> String {
    let mut sections = Vec::new();
    if !retrieved.trim().is_empty() {
        sections.push(format!("Retrieved Knowledge:\n{}", retrieved.trim()));
    }
    if !literature.trim().is_empty() {
        sections.push(format!("Current Literature:\n{}", literature.trim()));
    }
    sections.join("\n\n")
}

/// Generates multiple-choice questions for a topic.
///
/// Always returns a complete record: model and retrieval failures degrade to less
/// context or to the templated fallback question. The model is called at most once.
pub struct McqGenerator {
    retriever: Arc<Retriever>,
    literature: Arc<dyn LiteratureSource>,
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl McqGenerator {
    pub fn new(
        retriever: Arc<Retriever>,
        literature: Arc<dyn LiteratureSource>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            retriever,
            literature,
            model,
            prompts: Prompts::default(),
            max_tokens: 800,
            temperature: 0.7,
            timeout: Duration::from_secs(240),
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the output budget and temperature.
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Set the ceiling for each external call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate one question about `topic`.
    pub async fn generate(&self, topic: &str) -> McqRecord {
        self.generate_detailed(topic).await.record
    }

    /// Generate one question and report how it was obtained.
    #[instrument(skip(self), fields(model = %self.model.name()))]
    pub async fn generate_detailed(&self, topic: &str) -> GenerationReport {
        let topic = topic.trim();
        let context = self.assemble_context(topic).await;
        let request = self.build_request(topic, &context);

        let raw = match with_timeout(self.timeout, self.model.complete(&request)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Model call failed for {}, using fallback question: {}", topic, e);
                return GenerationReport {
                    record: McqRecord::fallback(topic),
                    repairs: Vec::new(),
                    used_fallback: true,
                    context,
                };
            }
        };

        let outcome = parse_response(&raw, topic);
        let repairs = outcome.repairs().to_vec();
        let used_fallback = match &outcome {
            ParseOutcome::Failure(reason) => {
                warn!("Unusable model output for {}, using fallback question: {}", topic, reason);
                true
            }
            _ => false,
        };

        let record = outcome.into_record(topic);
        info!(
            "Generated question for {} ({} repairs, fallback: {})",
            topic,
            repairs.len(),
            used_fallback
        );

        GenerationReport {
            record,
            repairs,
            used_fallback,
            context,
        }
    }

    /// Retrieved and literature context for `topic`, combined. Either part may be empty.
    pub async fn assemble_context(&self, topic: &str) -> String {
        let (retrieved, literature) = tokio::join!(
            self.retriever.get_context(topic),
            self.lookup_literature(topic)
        );
        combine_contexts(&retrieved, &literature)
    }

    async fn lookup_literature(&self, topic: &str) -> String {
        match with_timeout(self.timeout, self.literature.lookup(topic)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Literature lookup failed for {}: {}", topic, e);
                String::new()
            }
        }
    }

    /// The prompt sent to the model for `topic` with the given context.
    pub fn build_request(&self, topic: &str, context: &str) -> ModelRequest {
        let context = if context.trim().is_empty() {
            NO_CONTEXT.to_string()
        } else {
            context.to_string()
        };

        let mut vars = HashMap::new();
        vars.insert("topic", topic.to_string());
        vars.insert("context", context);

        ModelRequest {
            system: self.prompts.mcq.system.clone(),
            user: Prompts::render(&self.prompts.mcq.user, &vars),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            json_mode: true,
        }
    }
}
