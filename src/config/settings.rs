//! Configuration settings for QuizRag.

use crate::error::{QuizRagError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub web_search: WebSearchSettings,
    pub ingest: IngestSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.quizrag".to_string(),
        }
    }
}

/// Backend that serves model calls (chat completions or embeddings).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Hosted OpenAI API.
    #[default]
    OpenAI,
    /// Locally hosted Ollama server.
    Ollama,
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "ollama" | "local" => Ok(Provider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "openai"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model backend (openai, ollama).
    pub provider: Provider,
    /// Model name.
    pub model: String,
    /// Base URL of the model server. Empty means the provider default.
    pub endpoint: String,
    /// API key for hosted providers. Usually supplied through OPENAI_API_KEY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Hard ceiling for a single model call, in seconds.
    pub timeout_seconds: u64,
    /// Output budget for question generation.
    pub generation_max_tokens: u32,
    /// Sampling temperature for question generation.
    pub generation_temperature: f32,
    /// Output budget for answer feedback.
    pub validation_max_tokens: u32,
    /// Sampling temperature for answer feedback.
    pub validation_temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            endpoint: String::new(),
            api_key: None,
            timeout_seconds: 240,
            generation_max_tokens: 800,
            generation_temperature: 0.7,
            validation_max_tokens: 300,
            validation_temperature: 0.3,
        }
    }
}

impl LlmSettings {
    /// Endpoint to use, falling back to the provider default.
    pub fn endpoint_or_default(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.provider {
            Provider::OpenAI => "https://api.openai.com/v1".to_string(),
            Provider::Ollama => "http://localhost:11434".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding backend (openai, ollama).
    pub provider: Provider,
    /// Embedding model to use.
    pub model: String,
    /// Base URL of the embedding server. Empty means the provider default.
    pub endpoint: String,
    /// Embedding dimensions. Must match the vector collection.
    pub dimensions: u32,
    /// Hard ceiling for a single embedding call, in seconds.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            endpoint: String::new(),
            dimensions: 768,
            timeout_seconds: 60,
        }
    }
}

impl EmbeddingSettings {
    /// Endpoint to use, falling back to the provider default.
    pub fn endpoint_or_default(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.provider {
            Provider::OpenAI => "https://api.openai.com/v1".to_string(),
            Provider::Ollama => "http://localhost:11434".to_string(),
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried over from the previous chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Path to SQLite database.
    pub sqlite_path: String,
    /// Name of the collection holding indexed chunks.
    pub collection: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.quizrag/vectors.db".to_string(),
            collection: "study_materials".to_string(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks pulled into the prompt context.
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// Web literature lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSettings {
    /// Enable the literature lookup. It also needs an API key.
    pub enabled: bool,
    /// Search endpoint (Serper compatible).
    pub endpoint: String,
    /// API key. Usually supplied through SEARCH_API_KEY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Number of snippets kept.
    pub max_results: usize,
    /// Maximum characters kept per snippet.
    pub snippet_chars: usize,
    /// Hard ceiling for a search call, in seconds.
    pub timeout_seconds: u64,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key: None,
            max_results: 2,
            snippet_chars: 200,
            timeout_seconds: 15,
        }
    }
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Directory scanned by `ingest` and `/upload-documents`.
    pub documents_dir: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            documents_dir: "./documents".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory with `mcq.toml` / `feedback.toml` overriding the built-in prompts.
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Recognised environment variables are applied on top of the file.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Override values from environment variables.
    ///
    /// Takes a lookup function so tests can supply variables without touching the process env.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("QUIZRAG_LLM_PROVIDER") {
            self.llm.provider = v.parse().map_err(QuizRagError::Config)?;
        }
        if let Some(v) = get("QUIZRAG_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("QUIZRAG_LLM_ENDPOINT") {
            self.llm.endpoint = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("QUIZRAG_EMBEDDING_PROVIDER") {
            self.embedding.provider = v.parse().map_err(QuizRagError::Config)?;
        }
        if let Some(v) = get("QUIZRAG_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = get("QUIZRAG_COLLECTION") {
            self.vector_store.collection = v;
        }
        if let Some(v) = get("QUIZRAG_DOCUMENTS_DIR") {
            self.ingest.documents_dir = v;
        }
        if let Some(v) = get("SEARCH_API_KEY") {
            self.web_search.api_key = Some(v);
        }
        Ok(())
    }

    /// Reject combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(QuizRagError::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(QuizRagError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(QuizRagError::Config("embedding.dimensions must be positive".into()));
        }
        if self.retrieval.k == 0 {
            return Err(QuizRagError::Config("retrieval.k must be positive".into()));
        }
        if self.llm.timeout_seconds == 0
            || self.embedding.timeout_seconds == 0
            || self.web_search.timeout_seconds == 0
        {
            return Err(QuizRagError::Config("timeouts must be at least one second".into()));
        }
        if self.vector_store.collection.trim().is_empty() {
            return Err(QuizRagError::Config("vector_store.collection must not be empty".into()));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| QuizRagError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quizrag")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded documents directory.
    pub fn documents_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingest.documents_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunking.chunk_size, 800);
        assert_eq!(settings.chunking.chunk_overlap, 100);
        assert_eq!(settings.retrieval.k, 5);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("QUIZRAG_LLM_PROVIDER", "ollama"),
            ("QUIZRAG_LLM_MODEL", "qwen:latest"),
            ("QUIZRAG_COLLECTION", "npte"),
            ("SEARCH_API_KEY", "secret"),
            ("QUIZRAG_EMBEDDING_MODEL", "  "),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.llm.provider, Provider::Ollama);
        assert_eq!(settings.llm.model, "qwen:latest");
        assert_eq!(settings.llm.endpoint_or_default(), "http://localhost:11434");
        assert_eq!(settings.vector_store.collection, "npte");
        assert_eq!(settings.web_search.api_key.as_deref(), Some("secret"));
        // Blank values are ignored
        assert_eq!(settings.embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let mut settings = Settings::default();
        let result = settings.apply_env(|k| {
            (k == "QUIZRAG_LLM_PROVIDER").then(|| "anthropomorphic".to_string())
        });
        assert!(matches!(result, Err(QuizRagError::Config(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut settings = Settings::default();
        settings.chunking.chunk_overlap = 800;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts_are_rejected() {
        let mut settings = Settings::default();
        settings.web_search.timeout_seconds = 0;
        assert!(matches!(settings.validate(), Err(QuizRagError::Config(_))));

        let mut settings = Settings::default();
        settings.llm.timeout_seconds = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.embedding.timeout_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_keeps_sections() {
        let toml_str = r#"
            [llm]
            provider = "ollama"
            model = "llama3"

            [chunking]
            chunk_size = 500
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.llm.provider, Provider::Ollama);
        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.chunking.chunk_overlap, 100);
        assert_eq!(settings.vector_store.collection, "study_materials");
    }
}
