//! End-to-end ingestion, retrieval, generation and validation with offline backends.

use async_trait::async_trait;
use quizrag::config::Settings;
use quizrag::embedding::Embedder;
use quizrag::literature::NoLiterature;
use quizrag::llm::{LanguageModel, ModelRequest};
use quizrag::mcq::{McqRecord, RepairedField, DEFAULT_LINK};
use quizrag::orchestrator::QuizService;
use quizrag::validator::FALLBACK_FEEDBACK;
use quizrag::vector_store::{
    IndexedEntry, IndexedSource, MemoryVectorStore, SearchHit, SqliteVectorStore, VectorStore,
};
use quizrag::{QuizRagError, Result};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const DIMS: usize = 64;

/// Hashed bag-of-words: texts sharing words point the same way.
struct HashEmbedder;

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
    {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        v[(hasher.finish() % DIMS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(bag_of_words(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Replies from a queue and records every request it sees.
struct ScriptedModel {
    replies: Mutex<Vec<Result<String>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(QuizRagError::Model("no more replies".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Memory store that starts rejecting writes once `broken` is set.
#[derive(Default)]
struct BreakableStore {
    inner: MemoryVectorStore,
    broken: AtomicBool,
}

impl BreakableStore {
    fn writable(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(QuizRagError::VectorStore("database is locked".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for BreakableStore {
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        self.inner.ensure_collection(collection, dimensions).await
    }

    async fn collection_dimensions(&self, collection: &str) -> Result<Option<usize>> {
        self.inner.collection_dimensions(collection).await
    }

    async fn upsert_batch(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize> {
        self.writable()?;
        self.inner.upsert_batch(collection, entries).await
    }

    async fn replace_sources(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize> {
        self.writable()?;
        self.inner.replace_sources(collection, entries).await
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        topic: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        self.inner.search(collection, query_embedding, limit, topic).await
    }

    async fn delete_by_source(&self, collection: &str, source: &str) -> Result<usize> {
        self.writable()?;
        self.inner.delete_by_source(collection, source).await
    }

    async fn list_sources(&self, collection: &str) -> Result<Vec<IndexedSource>> {
        self.inner.list_sources(collection).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }
}

const CARDIO_TEXT: &str = "Ejection fraction measures the percentage of blood leaving the left \
ventricle with each contraction. A normal ejection fraction ranges from fifty to seventy percent.\n\n\
Cardiac rehabilitation phases progress from inpatient mobilisation to supervised outpatient \
exercise. Monitor heart rate, blood pressure and perceived exertion during every session.";

const NEURO_TEXT: &str = "Upper motor neuron lesions produce spasticity, hyperreflexia and a \
positive Babinski sign. Lower motor neuron lesions produce flaccidity, atrophy and fasciculations.";

fn write_corpus(dir: &Path) {
    std::fs::write(dir.join("cardio_notes.txt"), CARDIO_TEXT).unwrap();
    std::fs::write(dir.join("neuro_review.md"), NEURO_TEXT).unwrap();
    std::fs::write(dir.join("diagram.png"), [0x89, b'P', b'N', b'G']).unwrap();
}

fn settings_for(documents_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.ingest.documents_dir = documents_dir.display().to_string();
    settings.chunking.chunk_size = 200;
    settings.chunking.chunk_overlap = 20;
    settings.retrieval.k = 3;
    settings
}

async fn service_with(
    settings: Settings,
    store: Arc<dyn VectorStore>,
    model: Arc<ScriptedModel>,
) -> QuizService {
    QuizService::new(
        settings,
        store,
        Arc::new(HashEmbedder),
        model,
        Arc::new(NoLiterature),
    )
    .await
    .unwrap()
}

const GOOD_REPLY: &str = r#"Here is your question:
{"question": "What is a normal left ventricular ejection fraction?",
 "choices": ["A. 20-30%", "B. 35-45%", "C. 50-70%", "D. 80-95%"],
 "correct": 2,
 "explanations": {"0": "Severely reduced.", "1": "Mildly reduced.", "2": "Normal range.", "3": "Above normal."},
 "links": {"0": ["https://example.org/ef"], "1": ["https://example.org/ef"], "2": ["https://example.org/ef"], "3": ["https://example.org/ef"]}}"#;

#[tokio::test]
async fn test_ingest_generate_validate() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());

    let model = ScriptedModel::new(vec![
        Ok(GOOD_REPLY.to_string()),
        Ok("Correct. A normal ejection fraction is 50-70%.".to_string()),
    ]);
    let service = service_with(
        settings_for(docs.path()),
        Arc::new(MemoryVectorStore::new()),
        model.clone(),
    )
    .await;

    let report = service.ingest_directory(None).await.unwrap();
    assert_eq!(report.documents_processed, 2);
    assert_eq!(report.documents_skipped, 1);
    assert_eq!(report.documents_failed, 0);
    assert!(report.chunks_created >= 3);
    assert_eq!(service.index().count().await.unwrap(), report.chunks_created);

    let topic = "Cardiovascular and pulmonary systems";
    let generated = service.generate_mcq_detailed(topic).await;
    assert!(!generated.used_fallback);
    assert!(generated.repairs.is_empty());
    assert!(generated.context.starts_with("Retrieved Knowledge:"));
    assert!(generated.context.contains("Context 1:"));
    assert!(!generated.context.contains("Babinski"));

    let record = generated.record;
    assert!(record.is_complete());
    assert_eq!(record.correct, 2);
    assert_eq!(record.correct_label(), 'C');

    let prompt = &model.requests()[0];
    assert!(prompt.json_mode);
    assert!(prompt.user.contains(topic));
    assert!(prompt.user.contains("jection fraction"));

    let feedback = service
        .validate_answer(topic, 2, record.correct, &record.explanations)
        .await;
    assert!(feedback.correct);
    assert!(!feedback.suggest_same_topic);
    assert!(feedback.explanation.starts_with("Correct."));

    let feedback_prompt = &model.requests()[1];
    assert!(!feedback_prompt.json_mode);
    assert!(feedback_prompt.user.contains("Normal range."));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_degraded_generation_never_fails() {
    let docs = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![
        Err(QuizRagError::Model("connection refused".into())),
        Ok("I cannot produce JSON today.".to_string()),
        Ok(r#"{"question": "Which sign indicates an upper motor neuron lesion?", "correct": "D"}"#.to_string()),
    ]);
    let service = service_with(
        settings_for(docs.path()),
        Arc::new(MemoryVectorStore::new()),
        model.clone(),
    )
    .await;

    // Empty index, model down.
    let report = service.generate_mcq_detailed("Lymphatic system").await;
    assert!(report.used_fallback);
    assert!(report.context.is_empty());
    assert_eq!(report.record, McqRecord::fallback("Lymphatic system"));

    // Prose reply.
    let record = service.generate_mcq("Lymphatic system").await;
    assert_eq!(record, McqRecord::fallback("Lymphatic system"));

    // Partial object gets repaired.
    let report = service
        .generate_mcq_detailed("Neuromuscular and nervous systems")
        .await;
    assert!(!report.used_fallback);
    assert!(report.record.is_complete());
    assert_eq!(report.record.correct, 3);
    assert!(report.repairs.contains(&RepairedField::Choices));
    assert!(report.repairs.contains(&RepairedField::Links));
    assert_eq!(report.record.links[&0], vec![DEFAULT_LINK.to_string()]);

    // Model is now out of replies: feedback degrades, grading does not.
    let feedback = service
        .validate_answer("Neuromuscular and nervous systems", 0, 3, &BTreeMap::new())
        .await;
    assert!(!feedback.correct);
    assert!(feedback.suggest_same_topic);
    assert_eq!(feedback.explanation, FALLBACK_FEEDBACK);
}

#[tokio::test]
async fn test_reingest_replaces_and_topic_search() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());

    let service = service_with(
        settings_for(docs.path()),
        Arc::new(MemoryVectorStore::new()),
        ScriptedModel::new(Vec::new()),
    )
    .await;

    let first = service.ingest_directory(None).await.unwrap();
    let count = service.index().count().await.unwrap();
    let second = service.ingest_directory(None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(service.index().count().await.unwrap(), count);

    let hits = service
        .search("spasticity", 10, Some("Neuromuscular and nervous systems"))
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits
        .iter()
        .all(|h| h.chunk.topic == "Neuromuscular and nervous systems"));

    let sources = service.list_sources().await.unwrap();
    assert_eq!(sources.len(), 2);

    let missing = service
        .ingest_directory(Some(&docs.path().join("missing")))
        .await;
    assert!(matches!(missing, Err(QuizRagError::InvalidInput(_))));
}

#[tokio::test]
async fn test_sqlite_index_survives_restart() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());
    let data = tempfile::tempdir().unwrap();
    let db = data.path().join("vectors.db");

    let count = {
        let store = Arc::new(SqliteVectorStore::new(&db).unwrap());
        let service = service_with(settings_for(docs.path()), store, ScriptedModel::new(Vec::new())).await;
        service.ingest_directory(None).await.unwrap();
        let count = service.index().count().await.unwrap();
        service.shutdown().await.unwrap();
        count
    };
    assert!(count > 0);

    let store = Arc::new(SqliteVectorStore::new(&db).unwrap());
    let service = service_with(settings_for(docs.path()), store, ScriptedModel::new(Vec::new())).await;
    assert_eq!(service.index().count().await.unwrap(), count);

    let hits = service.search("ejection fraction", 2, None).await.unwrap();
    assert_eq!(hits[0].chunk.topic, "Cardiovascular and pulmonary systems");
}

#[tokio::test]
async fn test_store_failure_fails_ingestion_and_keeps_index() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());

    let store = Arc::new(BreakableStore::default());
    let service = service_with(
        settings_for(docs.path()),
        store.clone(),
        ScriptedModel::new(Vec::new()),
    )
    .await;

    service.ingest_directory(None).await.unwrap();
    let count = service.index().count().await.unwrap();
    assert!(count > 0);

    std::fs::write(docs.path().join("cardio_notes.txt"), "Revised notes on cardiac output.").unwrap();
    store.broken.store(true, Ordering::SeqCst);
    let err = service.ingest_directory(None).await.unwrap_err();
    assert!(matches!(err, QuizRagError::VectorStore(_)));

    assert_eq!(service.index().count().await.unwrap(), count);
    let hits = service.search("ejection fraction", 1, None).await.unwrap();
    assert!(hits[0].chunk.source.ends_with("cardio_notes.txt"));
    assert!(hits[0].chunk.content.contains("jection fraction"));
}
