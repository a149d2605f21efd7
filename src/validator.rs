//! Feedback on a learner's answer.

use crate::config::Prompts;
use crate::llm::{with_timeout, LanguageModel, ModelRequest};
use crate::mcq::label;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

/// Explanation returned when the model cannot be reached.
pub const FALLBACK_FEEDBACK: &str = "Unable to provide detailed feedback at this time.";

/// Outcome of checking one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the selected choice is the correct one.
    pub correct: bool,
    /// Feedback text from the model, or [`FALLBACK_FEEDBACK`].
    pub explanation: String,
    /// Suggest another question on the same topic (after a wrong answer).
    pub suggest_same_topic: bool,
    /// Not tracked yet; always `None`.
    pub mastery_level: Option<f32>,
}

/// Asks the model for feedback on an answer. Correctness itself is decided locally.
pub struct AnswerValidator {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl AnswerValidator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            max_tokens: 300,
            temperature: 0.3,
            timeout: Duration::from_secs(240),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check `selected` against `correct` and ask for feedback.
    #[instrument(skip(self, explanations))]
    pub async fn validate(
        &self,
        topic: &str,
        selected: usize,
        correct: usize,
        explanations: &BTreeMap<usize, String>,
    ) -> ValidationResult {
        let is_correct = selected == correct;
        let request = self.build_request(topic, selected, correct, explanations);

        let explanation = match with_timeout(self.timeout, self.model.complete(&request)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Empty feedback from model for {}", topic);
                FALLBACK_FEEDBACK.to_string()
            }
            Err(e) => {
                warn!("Feedback generation failed for {}: {}", topic, e);
                FALLBACK_FEEDBACK.to_string()
            }
        };

        ValidationResult {
            correct: is_correct,
            explanation,
            suggest_same_topic: !is_correct,
            mastery_level: None,
        }
    }

    fn build_request(
        &self,
        topic: &str,
        selected: usize,
        correct: usize,
        explanations: &BTreeMap<usize, String>,
    ) -> ModelRequest {
        let mut vars = HashMap::new();
        vars.insert("topic", topic.to_string());
        vars.insert("selected", format!("{} (index {})", label(selected), selected));
        vars.insert("correct", format!("{} (index {})", label(correct), correct));
        vars.insert(
            "explanation",
            explanations
                .get(&selected)
                .cloned()
                .unwrap_or_else(|| "Not available".to_string()),
        );

        ModelRequest {
            system: self.prompts.feedback.system.clone(),
            user: Prompts::render(&self.prompts.feedback.user, &vars),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            json_mode: false,
        }
    }
}
