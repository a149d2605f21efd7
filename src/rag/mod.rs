//! Retrieval of study-material context for question generation.

pub mod context;

pub use context::{format_context_for_display, format_context_for_prompt, Retriever, DEFAULT_K};
