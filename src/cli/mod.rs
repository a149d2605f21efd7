//! CLI module for QuizRag.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// QuizRag - Study questions from your own documents
///
/// Ingests PDF, DOCX and text study material into a local vector index and generates
/// grounded multiple-choice questions with per-choice explanations.
#[derive(Parser, Debug)]
#[command(name = "quizrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest study documents from a directory into the index
    Ingest {
        /// Directory to scan (defaults to ingest.documents_dir)
        dir: Option<String>,
    },

    /// Generate a multiple-choice question on a topic
    Generate {
        /// Topic to ask about
        topic: String,

        /// Print the question record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check an answer and get feedback
    Validate {
        /// Topic of the question
        topic: String,

        /// Index of the chosen answer (0-3)
        #[arg(short, long)]
        selected: usize,

        /// Index of the correct answer (0-3)
        #[arg(short = 'r', long)]
        correct: usize,

        /// Explanation of the chosen answer, passed to the model as context
        #[arg(short, long)]
        explanation: Option<String>,
    },

    /// Search indexed study material
    Search {
        /// Search query
        query: String,

        /// Only return chunks tagged with this topic
        #[arg(short, long)]
        topic: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List indexed documents
    List,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::parse_from([
            "quizrag", "validate", "Gait analysis", "--selected", "1", "--correct", "2",
        ]);
        match cli.command {
            Commands::Validate {
                topic,
                selected,
                correct,
                explanation,
            } => {
                assert_eq!(topic, "Gait analysis");
                assert_eq!(selected, 1);
                assert_eq!(correct, 2);
                assert!(explanation.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_defaults() {
        let cli = Cli::parse_from(["quizrag", "-vv", "search", "spasticity"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Search { query, topic, limit } => {
                assert_eq!(query, "spasticity");
                assert!(topic.is_none());
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["quizrag", "serve"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 3000);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
