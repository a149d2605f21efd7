//! Multiple-choice question records, model-output repair and generation.

mod generator;
mod repair;

pub use generator::{combine_contexts, GenerationReport, McqGenerator};
pub use repair::{extract_json_object, parse_response, repair, ParseFailure, ParseOutcome, RepairedField};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of choices in every question.
pub const CHOICE_COUNT: usize = 4;

/// Choice labels, by index.
pub const LABELS: [char; CHOICE_COUNT] = ['A', 'B', 'C', 'D'];

/// Reference used when the model supplies no link for a choice.
pub const DEFAULT_LINK: &str = "https://www.ncbi.nlm.nih.gov/";

/// Index of the correct answer in the templated fallback question. Carries no meaning.
pub const FALLBACK_CORRECT_INDEX: usize = 0;

/// Text that shows the model echoed the prompt's placeholders instead of answering.
const PLACEHOLDER_MARKERS: [&str; 5] = [
    "Option A",
    "Option B",
    "Option C",
    "Option D",
    "Explanation for option",
];

/// A validated four-choice question.
///
/// `explanations` and `links` always hold keys 0 to 3; they serialize with string keys
/// (`"0"`..`"3"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqRecord {
    pub question: String,
    pub choices: Vec<String>,
    pub correct: usize,
    pub explanations: BTreeMap<usize, String>,
    pub links: BTreeMap<usize, Vec<String>>,
}

impl McqRecord {
    /// Templated question used when the model gave nothing usable.
    pub fn fallback(topic: &str) -> Self {
        let t = topic.trim().to_lowercase();
        let choices = vec![
            format!("A. Apply current evidence-based principles of {}", t),
            format!("B. Rely on a single outdated guideline for {}", t),
            format!("C. Disregard the history relevant to {}", t),
            format!("D. Skip reassessment when managing {}", t),
        ];

        let explanations = (0..CHOICE_COUNT)
            .map(|i| (i, synthesized_explanation(i, FALLBACK_CORRECT_INDEX, topic)))
            .collect();

        Self {
            question: format!(
                "Which approach is most appropriate when working through a case involving {}?",
                t
            ),
            choices,
            correct: FALLBACK_CORRECT_INDEX,
            explanations,
            links: default_links(),
        }
    }

    /// True when the record has exactly four choices, a valid answer index and all keys.
    pub fn is_complete(&self) -> bool {
        let keys: Vec<usize> = (0..CHOICE_COUNT).collect();
        self.choices.len() == CHOICE_COUNT
            && self.correct < CHOICE_COUNT
            && self.explanations.keys().copied().eq(keys.iter().copied())
            && self.links.keys().copied().eq(keys.iter().copied())
    }

    /// True if any choice still contains prompt placeholder text.
    pub fn has_placeholder_choices(&self) -> bool {
        self.choices
            .iter()
            .any(|c| PLACEHOLDER_MARKERS.iter().any(|m| c.contains(m)))
    }

    /// Label of the correct choice ("A".."D").
    pub fn correct_label(&self) -> char {
        label(self.correct)
    }
}

/// Letter label for a choice index. Out-of-range indices map to '?'.
pub fn label(index: usize) -> char {
    LABELS.get(index).copied().unwrap_or('?')
}

/// Generic explanation for a choice the model did not explain.
pub(crate) fn synthesized_explanation(index: usize, correct: usize, topic: &str) -> String {
    if index == correct {
        format!(
            "{} is the correct answer: it reflects accepted practice for {}.",
            label(index),
            topic
        )
    } else {
        format!(
            "{} is incorrect: it does not reflect accepted practice for {}.",
            label(index),
            topic
        )
    }
}

pub(crate) fn default_links() -> BTreeMap<usize, Vec<String>> {
    (0..CHOICE_COUNT)
        .map(|i| (i, vec![DEFAULT_LINK.to_string()]))
        .collect()
}
