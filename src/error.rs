//! Error types for QuizRag.

use thiserror::Error;

/// Library-level error type for QuizRag operations.
#[derive(Error, Debug)]
pub enum QuizRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to ingest {path}: {reason}")]
    Ingest { path: String, reason: String },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Language model error: {0}")]
    Model(String),

    #[error("Web search error: {0}")]
    WebSearch(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl QuizRagError {
    /// Build an ingestion error for a specific file.
    pub fn ingest(path: impl AsRef<std::path::Path>, reason: impl std::fmt::Display) -> Self {
        Self::Ingest {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for QuizRag operations.
pub type Result<T> = std::result::Result<T, QuizRagError>;
