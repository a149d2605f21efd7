//! Service facade for QuizRag.
//!
//! Owns the index, generator and validator and is passed explicitly to the CLI
//! commands and HTTP handlers. Build it once at startup and call
//! [`QuizService::shutdown`] before exit.

use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::Result;
use crate::ingest::{DocumentIngestor, IngestReport};
use crate::literature::{create_source, LiteratureSource};
use crate::llm::{create_model, LanguageModel};
use crate::mcq::{GenerationReport, McqGenerator, McqRecord};
use crate::rag::Retriever;
use crate::validator::{AnswerValidator, ValidationResult};
use crate::vector_store::{IndexedSource, SearchHit, SqliteVectorStore, VectorIndex, VectorStore};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// The main entry point to question generation and document ingestion.
pub struct QuizService {
    settings: Settings,
    index: Arc<VectorIndex>,
    ingestor: DocumentIngestor,
    generator: McqGenerator,
    validator: AnswerValidator,
}

impl QuizService {
    /// Build the service from configuration: SQLite store, configured embedder, model
    /// backend and literature source.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let embedder = create_embedder(&settings.embedding, settings.llm.api_key.as_deref())?;
        let model = create_model(&settings.llm)?;
        let literature = create_source(&settings.web_search)?;
        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        info!(
            "Using {} model {} and {} embeddings {}",
            settings.llm.provider, settings.llm.model, settings.embedding.provider, settings.embedding.model
        );

        Self::new(settings, store, embedder, model, literature).await
    }

    /// Build the service from injected components.
    ///
    /// Creates the collection if needed and fails if it exists with a different
    /// dimensionality than the embedder produces.
    pub async fn new(
        settings: Settings,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        literature: Arc<dyn LiteratureSource>,
    ) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let timeout = Duration::from_secs(settings.llm.timeout_seconds);

        let index = Arc::new(VectorIndex::new(
            store,
            embedder,
            settings.vector_store.collection.clone(),
        ));
        index.ensure_collection().await?;

        let ingestor =
            DocumentIngestor::with_chunking(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;

        let retriever = Arc::new(Retriever::new(index.clone()).with_k(settings.retrieval.k));

        let generator = McqGenerator::new(retriever, literature, model.clone())
            .with_prompts(prompts.clone())
            .with_sampling(
                settings.llm.generation_max_tokens,
                settings.llm.generation_temperature,
            )
            .with_timeout(timeout);

        let validator = AnswerValidator::new(model)
            .with_prompts(prompts)
            .with_sampling(
                settings.llm.validation_max_tokens,
                settings.llm.validation_temperature,
            )
            .with_timeout(timeout);

        Ok(Self {
            settings,
            index,
            ingestor,
            generator,
            validator,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the vector index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Generate one question. Never fails; see [`McqGenerator`].
    pub async fn generate_mcq(&self, topic: &str) -> McqRecord {
        self.generator.generate(topic).await
    }

    /// Generate one question with repair and context details.
    pub async fn generate_mcq_detailed(&self, topic: &str) -> GenerationReport {
        self.generator.generate_detailed(topic).await
    }

    /// Grade an answer and fetch feedback.
    pub async fn validate_answer(
        &self,
        topic: &str,
        selected: usize,
        correct: usize,
        explanations: &BTreeMap<usize, String>,
    ) -> ValidationResult {
        self.validator
            .validate(topic, selected, correct, explanations)
            .await
    }

    /// Ingest a directory, defaulting to the configured documents directory.
    #[instrument(skip(self))]
    pub async fn ingest_directory(&self, dir: Option<&Path>) -> Result<IngestReport> {
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => self.settings.documents_dir(),
        };
        self.ingestor
            .load_documents_from_directory(&dir, &self.index)
            .await
    }

    /// Nearest chunks to a free-text query.
    pub async fn search(&self, query: &str, k: usize, topic: Option<&str>) -> Result<Vec<SearchHit>> {
        self.index.search(query, k, topic).await
    }

    /// Indexed source documents.
    pub async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        self.index.list_sources().await
    }

    /// Flush pending writes. Call once before exit.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down, flushing vector store");
        self.index.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literature::NoLiterature;
    use crate::llm::ModelRequest;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;

    struct UnitEmbedder(usize);

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; self.0];
            v[0] = 1.0;
            Ok(v)
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            self.0
        }
    }

    struct SilentModel;

    #[async_trait]
    impl LanguageModel for SilentModel {
        async fn complete(&self, _request: &ModelRequest) -> Result<String> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    async fn service(store: Arc<dyn VectorStore>, dims: usize) -> Result<QuizService> {
        QuizService::new(
            Settings::default(),
            store,
            Arc::new(UnitEmbedder(dims)),
            Arc::new(SilentModel),
            Arc::new(NoLiterature),
        )
        .await
    }

    #[tokio::test]
    async fn test_new_creates_collection() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let svc = service(store.clone(), 8).await.unwrap();
        assert_eq!(
            store.collection_dimensions("study_materials").await.unwrap(),
            Some(8)
        );
        svc.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_mismatched_embedder() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        service(store.clone(), 8).await.unwrap();
        assert!(service(store, 16).await.is_err());
    }

    #[tokio::test]
    async fn test_ingest_and_generate_with_empty_model_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("neuro.txt"), "Upper motor neuron lesions cause spasticity.").unwrap();

        let svc = service(Arc::new(MemoryVectorStore::new()), 4).await.unwrap();
        let report = svc.ingest_directory(Some(dir.path())).await.unwrap();
        assert_eq!(report.documents_processed, 1);
        assert_eq!(svc.index().count().await.unwrap(), 1);

        let record = svc.generate_mcq("Neuromuscular and nervous systems").await;
        assert!(record.is_complete());

        let hits = svc.search("spasticity", 3, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.topic, "Neuromuscular and nervous systems");
    }
}
