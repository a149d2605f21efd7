//! QuizRag - Study questions from your own documents
//!
//! A retrieval-augmented generator of multiple-choice study questions.
//!
//! # Overview
//!
//! QuizRag allows you to:
//! - Ingest PDF, DOCX and plain-text study material into a local vector index
//! - Generate four-choice questions grounded in that material, with per-choice
//!   explanations and reference links
//! - Check a learner's answer and get feedback from the model
//! - Serve all of the above over HTTP for a quiz frontend
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `chunking` - Chunk type and recursive character splitter
//! - `ingest` - Text extraction, cleaning and topic tagging
//! - `embedding` - Embedding backends
//! - `vector_store` - Vector store backends and the [`vector_store::VectorIndex`]
//! - `rag` - Topic-filtered retrieval and context formatting
//! - `llm` - Language model backends
//! - `literature` - Optional web literature lookup
//! - `mcq` - Question records, output repair and generation
//! - `validator` - Answer feedback
//! - `orchestrator` - The [`orchestrator::QuizService`] facade
//!
//! # Example
//!
//! ```rust,no_run
//! use quizrag::config::Settings;
//! use quizrag::orchestrator::QuizService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let service = QuizService::from_settings(settings).await?;
//!
//!     let report = service.ingest_directory(None).await?;
//!     println!("Indexed {} chunks", report.chunks_created);
//!
//!     let mcq = service.generate_mcq("Cardiovascular and pulmonary systems").await;
//!     println!("{}", mcq.question);
//!
//!     service.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod literature;
pub mod llm;
pub mod mcq;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod validator;
pub mod vector_store;

pub use error::{QuizRagError, Result};
