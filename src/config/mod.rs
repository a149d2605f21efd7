//! Configuration module for QuizRag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{FeedbackPrompts, McqPrompts, Prompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, IngestSettings, LlmSettings,
    PromptSettings, Provider, RetrievalSettings, Settings, VectorStoreSettings,
    WebSearchSettings,
};
