//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::QuizService;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    topic: Option<&str>,
    limit: usize,
    settings: Settings,
) -> Result<()> {
    let service = QuizService::from_settings(settings).await?;

    let spinner = Output::spinner("Searching...");
    let results = service.search(query, limit, topic).await;
    spinner.finish_and_clear();

    match results {
        Ok(hits) => {
            if hits.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", hits.len()));
                for hit in &hits {
                    Output::search_result(hit);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    service.shutdown().await?;
    Ok(())
}
