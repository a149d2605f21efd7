//! QuizRag CLI entry point.

use anyhow::Result;
use clap::Parser;
use quizrag::cli::{commands, Cli, Commands};
use quizrag::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("quizrag={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match cli.command {
        Commands::Ingest { dir } => {
            commands::run_ingest(dir, settings).await?;
        }

        Commands::Generate { topic, json } => {
            commands::run_generate(&topic, json, settings).await?;
        }

        Commands::Validate {
            topic,
            selected,
            correct,
            explanation,
        } => {
            commands::run_validate(&topic, selected, correct, explanation, settings).await?;
        }

        Commands::Search { query, topic, limit } => {
            commands::run_search(&query, topic.as_deref(), limit, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
