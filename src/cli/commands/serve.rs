//! HTTP API server for the quiz frontend.
//!
//! Provides REST endpoints for question generation, answer feedback and ingestion.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::QuizRagError;
use crate::ingest::IngestReport;
use crate::mcq::CHOICE_COUNT;
use crate::orchestrator::QuizService;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state.
///
/// `service` is `None` when startup failed; every endpoint except `/health` then
/// answers 503.
pub struct AppState {
    pub service: Option<Arc<QuizService>>,
    pub settings: Settings,
}

/// Run the HTTP API server until Ctrl+C.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let service = match QuizService::from_settings(settings.clone()).await {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            error!("Service initialization failed: {}", e);
            Output::error(&format!("Service initialization failed: {}", e));
            Output::warning("Serving /health only; other endpoints return 503.");
            None
        }
    };

    let state = Arc::new(AppState {
        service: service.clone(),
        settings,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("QuizRag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Generate question", "POST /generate-mcq");
    Output::kv("Validate answer", "POST /validate-answer");
    Output::kv("Ingest documents", "POST /upload-documents");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(service) = service {
        service.shutdown().await?;
    }
    info!("Server stopped");

    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/generate-mcq", post(generate_mcq))
        .route("/api/ask", post(generate_mcq))
        .route("/validate-answer", post(validate_answer))
        .route("/upload-documents", post(upload_documents))
        .route("/api/upload_documents", post(upload_documents))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(alias = "prompt")]
    topic: String,
}

#[derive(Deserialize)]
struct ValidateRequest {
    topic: String,
    selected: usize,
    correct: usize,
    #[serde(default)]
    explanations: BTreeMap<usize, String>,
}

#[derive(Deserialize, Default)]
struct UploadRequest {
    #[serde(default)]
    directory: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    documents_processed: usize,
    chunks_created: usize,
}

impl UploadResponse {
    fn from_report(report: &IngestReport) -> Self {
        Self {
            message: format!(
                "Processed {} documents ({} skipped, {} failed)",
                report.documents_processed, report.documents_skipped, report.documents_failed
            ),
            documents_processed: report.documents_processed,
            chunks_created: report.chunks_created,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            message,
            documents_processed: 0,
            chunks_created: 0,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn unavailable() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Service not initialized")
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service_ready": state.service.is_some(),
    }))
}

async fn generate_mcq(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    let Some(service) = &state.service else {
        return unavailable();
    };

    let topic = req.topic.trim();
    if topic.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Topic must not be empty");
    }

    Json(service.generate_mcq(topic).await).into_response()
}

async fn validate_answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> Response {
    let Some(service) = &state.service else {
        return unavailable();
    };

    if req.topic.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Topic must not be empty");
    }
    if req.selected >= CHOICE_COUNT || req.correct >= CHOICE_COUNT {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Answer indices must be between 0 and {}", CHOICE_COUNT - 1),
        );
    }

    let result = service
        .validate_answer(req.topic.trim(), req.selected, req.correct, &req.explanations)
        .await;
    Json(result).into_response()
}

async fn upload_documents(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let Some(service) = &state.service else {
        return unavailable();
    };

    // An empty body means "use the configured directory".
    let req: UploadRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UploadRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e)),
        }
    };
    let documents_dir = state.settings.documents_dir();

    let dir = match req.directory.as_deref() {
        Some(requested) => match confine(&documents_dir, requested) {
            Ok(dir) => dir,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(UploadResponse::failed(e.to_string())),
                )
                    .into_response()
            }
        },
        None => documents_dir,
    };

    match service.ingest_directory(Some(&dir)).await {
        Ok(report) => Json(UploadResponse::from_report(&report)).into_response(),
        Err(e) => {
            let status = match &e {
                QuizRagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(UploadResponse::failed(format!("Document processing failed: {}", e))),
            )
                .into_response()
        }
    }
}

/// Resolve `requested` relative to `root` and reject anything that escapes it.
fn confine(root: &Path, requested: &str) -> Result<PathBuf, QuizRagError> {
    let requested = Settings::expand_path(requested);
    let candidate = if requested.is_absolute() {
        requested
    } else {
        root.join(requested)
    };

    let root = root.canonicalize().map_err(|e| {
        QuizRagError::InvalidInput(format!("Documents directory unavailable: {}", e))
    })?;
    let candidate = candidate.canonicalize().map_err(|e| {
        QuizRagError::InvalidInput(format!("Directory not found: {}", e))
    })?;

    if candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(QuizRagError::InvalidInput(
            "Directory must be inside the documents directory".to_string(),
        ))
    }
}
