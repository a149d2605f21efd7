//! Validate command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::mcq::{label, CHOICE_COUNT};
use crate::orchestrator::QuizService;
use anyhow::Result;
use std::collections::BTreeMap;

/// Run the validate command.
pub async fn run_validate(
    topic: &str,
    selected: usize,
    correct: usize,
    explanation: Option<String>,
    settings: Settings,
) -> Result<()> {
    if selected >= CHOICE_COUNT || correct >= CHOICE_COUNT {
        anyhow::bail!("Answer indices must be between 0 and {}", CHOICE_COUNT - 1);
    }

    let service = QuizService::from_settings(settings).await?;

    let mut explanations = BTreeMap::new();
    if let Some(text) = explanation {
        explanations.insert(selected, text);
    }

    let spinner = Output::spinner("Checking answer...");
    let result = service
        .validate_answer(topic, selected, correct, &explanations)
        .await;
    spinner.finish_and_clear();

    if result.correct {
        Output::success(&format!("{} is correct!", label(selected)));
    } else {
        Output::warning(&format!(
            "{} is incorrect. The correct answer is {}.",
            label(selected),
            label(correct)
        ));
    }

    println!("\n{}", result.explanation);

    if result.suggest_same_topic {
        println!();
        Output::info(&format!("Try another question: quizrag generate \"{}\"", topic));
    }

    service.shutdown().await?;
    Ok(())
}
