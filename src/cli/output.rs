//! CLI output formatting utilities.

use crate::mcq::{label, McqRecord};
use crate::vector_store::{IndexedSource, SearchHit};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an indexed source.
    pub fn source_info(source: &IndexedSource) {
        println!(
            "  {} {} ({}, {} chunks, {})",
            style("*").cyan(),
            style(&source.source).bold(),
            style(&source.topic).dim(),
            source.chunk_count,
            source.indexed_at.format("%Y-%m-%d %H:%M")
        );
    }

    /// Print a search hit.
    pub fn search_result(hit: &SearchHit) {
        println!(
            "\n{} {} #{} [{}] (score: {:.2})",
            style(">>").green(),
            style(&hit.chunk.source).bold(),
            hit.chunk.chunk_index,
            style(&hit.chunk.topic).cyan(),
            hit.score
        );
        println!("   {}", content_preview(&hit.chunk.content, 200));
    }

    /// Print a question with its choices, answer and explanations.
    pub fn mcq(record: &McqRecord) {
        println!("\n{}", style(&record.question).bold());
        for choice in &record.choices {
            println!("  {}", choice);
        }

        println!(
            "\n{} {}",
            style("Answer:").green().bold(),
            record.correct_label()
        );

        for (index, explanation) in &record.explanations {
            println!("  {} {}", style(format!("{}:", label(*index))).cyan(), explanation);
            if let Some(links) = record.links.get(index) {
                for link in links {
                    println!("     {}", style(link).dim());
                }
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(s) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(s);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Collapse newlines and truncate on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
