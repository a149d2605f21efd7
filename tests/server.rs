//! HTTP API behaviour, driven through the router without binding a socket.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use quizrag::cli::commands::serve::{router, AppState};
use quizrag::config::Settings;
use quizrag::embedding::Embedder;
use quizrag::literature::NoLiterature;
use quizrag::llm::{LanguageModel, ModelRequest};
use quizrag::mcq::McqRecord;
use quizrag::orchestrator::QuizService;
use quizrag::vector_store::MemoryVectorStore;
use quizrag::Result;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

struct LengthEmbedder;

#[async_trait]
impl Embedder for LengthEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, text.len() as f32 / 1000.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Answers question prompts with prose and feedback prompts with a fixed sentence.
struct ProseModel;

#[async_trait]
impl LanguageModel for ProseModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String> {
        if request.json_mode {
            Ok("No JSON here.".to_string())
        } else {
            Ok("Review the Frank-Starling mechanism.".to_string())
        }
    }

    fn name(&self) -> &str {
        "prose"
    }
}

async fn ready_state(documents_dir: &Path) -> Arc<AppState> {
    let mut settings = Settings::default();
    settings.ingest.documents_dir = documents_dir.display().to_string();

    let service = QuizService::new(
        settings.clone(),
        Arc::new(MemoryVectorStore::new()),
        Arc::new(LengthEmbedder),
        Arc::new(ProseModel),
        Arc::new(NoLiterature),
    )
    .await
    .unwrap();

    Arc::new(AppState {
        service: Some(Arc::new(service)),
        settings,
    })
}

fn unready_state() -> Arc<AppState> {
    Arc::new(AppState {
        service: None,
        settings: Settings::default(),
    })
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_always_answers() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(unready_state(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service_ready"], false);
}

#[tokio::test]
async fn test_uninitialized_service_is_unavailable() {
    let (status, _) = send(unready_state(), post("/generate-mcq", json!({"topic": "Gait"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(
        unready_state(),
        post("/validate-answer", json!({"topic": "Gait", "selected": 0, "correct": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(unready_state(), post("/upload-documents", json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_generate_mcq() {
    let docs = tempfile::tempdir().unwrap();
    let state = ready_state(docs.path()).await;

    let (status, _) = send(state.clone(), post("/generate-mcq", json!({"topic": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        state.clone(),
        post("/generate-mcq", json!({"topic": "Cardiac rehabilitation"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["choices"].as_array().unwrap().len(), 4);
    for key in ["0", "1", "2", "3"] {
        assert!(body["explanations"][key].is_string());
        assert!(body["links"][key].is_array());
    }
    let record: McqRecord = serde_json::from_value(body).unwrap();
    assert_eq!(record, McqRecord::fallback("Cardiac rehabilitation"));

    let (status, body) = send(state, post("/api/ask", json!({"prompt": "Cardiac rehabilitation"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["question"].is_string());
}

#[tokio::test]
async fn test_validate_answer() {
    let docs = tempfile::tempdir().unwrap();
    let state = ready_state(docs.path()).await;

    let (status, _) = send(
        state.clone(),
        post("/validate-answer", json!({"topic": "Heart", "selected": 4, "correct": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        state,
        post(
            "/validate-answer",
            json!({"topic": "Heart", "selected": 0, "correct": 1, "explanations": {"0": "Too low."}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["correct"], false);
    assert_eq!(body["suggest_same_topic"], true);
    assert_eq!(body["explanation"], "Review the Frank-Starling mechanism.");
    assert!(body["mastery_level"].is_null());
}

#[tokio::test]
async fn test_upload_documents() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("cardio.txt"), "Stroke volume times heart rate is cardiac output.").unwrap();
    std::fs::create_dir(docs.path().join("neuro")).unwrap();
    std::fs::write(docs.path().join("neuro").join("neuro.txt"), "Dermatomes map sensory roots.").unwrap();
    let state = ready_state(docs.path()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/upload-documents")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(state.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents_processed"], 2);
    assert_eq!(body["chunks_created"], 2);
    assert!(body["message"].is_string());

    let (status, body) = send(state.clone(), post("/upload-documents", json!({"directory": "neuro"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents_processed"], 1);

    let (status, body) = send(state, post("/upload-documents", json!({"directory": ".."}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["documents_processed"], 0);
}
