//! Generate command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::QuizService;
use anyhow::Result;

/// Run the generate command.
pub async fn run_generate(topic: &str, json: bool, settings: Settings) -> Result<()> {
    if topic.trim().is_empty() {
        anyhow::bail!("Topic must not be empty");
    }

    let service = QuizService::from_settings(settings).await?;

    let spinner = Output::spinner(&format!("Generating a question on {}...", topic.trim()));
    let report = service.generate_mcq_detailed(topic).await;
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report.record)?);
    } else {
        if report.used_fallback {
            Output::warning("The model gave no usable question; showing a generic one.");
        } else if !report.repairs.is_empty() {
            Output::info(&format!("Repaired model output: {:?}", report.repairs));
        }
        if report.context.is_empty() {
            Output::warning("No study material matched this topic.");
        }
        Output::mcq(&report.record);
    }

    service.shutdown().await?;
    Ok(())
}
