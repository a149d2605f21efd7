//! Ingest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::QuizService;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(dir: Option<String>, settings: Settings) -> Result<()> {
    let dir = dir
        .map(|d| Settings::expand_path(&d))
        .unwrap_or_else(|| settings.documents_dir());

    let service = QuizService::from_settings(settings).await?;

    let spinner = Output::spinner(&format!("Ingesting documents from {}...", dir.display()));
    let result = service.ingest_directory(Some(&dir)).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            service.shutdown().await?;
            return Err(e.into());
        }
    };

    if report.documents_processed == 0 {
        Output::warning(&format!("No documents were ingested from {}", dir.display()));
    } else {
        Output::success(&format!(
            "Processed {} documents into {} chunks",
            report.documents_processed, report.chunks_created
        ));
    }

    Output::kv("Skipped (unsupported)", &report.documents_skipped.to_string());
    Output::kv("Failed", &report.documents_failed.to_string());
    Output::kv("Total chunks indexed", &service.index().count().await?.to_string());

    service.shutdown().await?;
    Ok(())
}

