//! Tolerant parsing of model output into an [`McqRecord`].
//!
//! The raw completion is reduced to the outermost `{ ... }` span and parsed as JSON.
//! Each field is then repaired independently: anything missing or malformed is replaced
//! with templated content, so a parsed object always yields a complete record.

use super::{
    default_links, label, synthesized_explanation, McqRecord, CHOICE_COUNT, DEFAULT_LINK, LABELS,
};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static CHOICE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Da-d]\s*[.):]\s*").expect("Invalid regex"));

/// A field that had to be replaced or normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairedField {
    Question,
    Choices,
    Correct,
    Explanations,
    Links,
}

/// Why the model output could not be parsed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No `{ ... }` span in the text.
    NoJsonObject,
    /// The span is not a valid JSON object.
    InvalidJson(String),
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFailure::NoJsonObject => write!(f, "no JSON object found"),
            ParseFailure::InvalidJson(e) => write!(f, "invalid JSON: {}", e),
        }
    }
}

/// Result of parsing one model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Well-formed output, used as is.
    Success(McqRecord),
    /// Parsed, but some fields were repaired.
    Repaired {
        record: McqRecord,
        repairs: Vec<RepairedField>,
    },
    /// Nothing usable; callers fall back to the templated record.
    Failure(ParseFailure),
}

impl ParseOutcome {
    /// The parsed record, or the templated fallback for `topic`.
    pub fn into_record(self, topic: &str) -> McqRecord {
        match self {
            ParseOutcome::Success(record) | ParseOutcome::Repaired { record, .. } => record,
            ParseOutcome::Failure(_) => McqRecord::fallback(topic),
        }
    }

    pub fn repairs(&self) -> &[RepairedField] {
        match self {
            ParseOutcome::Repaired { repairs, .. } => repairs,
            _ => &[],
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ParseOutcome::Failure(_))
    }
}

/// The text between the first `{` and the last `}`, inclusive.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse a raw model completion for a question about `topic`.
pub fn parse_response(raw: &str, topic: &str) -> ParseOutcome {
    let Some(json_str) = extract_json_object(raw) else {
        return ParseOutcome::Failure(ParseFailure::NoJsonObject);
    };

    let object: Map<String, Value> = match serde_json::from_str(json_str) {
        Ok(map) => map,
        Err(e) => return ParseOutcome::Failure(ParseFailure::InvalidJson(e.to_string())),
    };

    let (record, repairs) = repair(&object, topic);
    if record.has_placeholder_choices() {
        warn!("Generated question for {} still contains placeholder choices", topic);
    }

    if repairs.is_empty() {
        ParseOutcome::Success(record)
    } else {
        debug!("Repaired fields: {:?}", repairs);
        ParseOutcome::Repaired { record, repairs }
    }
}

/// Build a complete record from a parsed object, listing every field that was changed.
///
/// Applying it to an already well-formed object changes nothing.
pub fn repair(object: &Map<String, Value>, topic: &str) -> (McqRecord, Vec<RepairedField>) {
    let mut repairs = Vec::new();

    let question = match object.get("question").and_then(Value::as_str).map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => {
            repairs.push(RepairedField::Question);
            format!("Which of the following statements about {} is correct?", topic)
        }
    };

    let choices = match repair_choices(object.get("choices")) {
        Some((choices, changed)) => {
            if changed {
                repairs.push(RepairedField::Choices);
            }
            choices
        }
        None => {
            repairs.push(RepairedField::Choices);
            placeholder_choices()
        }
    };

    let correct = match object.get("correct").and_then(parse_correct) {
        Some(c) => c,
        None => {
            repairs.push(RepairedField::Correct);
            0
        }
    };

    let (explanations, changed) = repair_explanations(object.get("explanations"), correct, topic);
    if changed {
        repairs.push(RepairedField::Explanations);
    }

    let (links, changed) = repair_links(object.get("links"));
    if changed {
        repairs.push(RepairedField::Links);
    }

    (
        McqRecord {
            question,
            choices,
            correct,
            explanations,
            links,
        },
        repairs,
    )
}

fn placeholder_choices() -> Vec<String> {
    LABELS.iter().map(|l| format!("{}. Option {}", l, l)).collect()
}

/// Four distinct, non-empty strings, relabelled "A. ".."D. ". `None` if unusable.
fn repair_choices(value: Option<&Value>) -> Option<(Vec<String>, bool)> {
    let items = value?.as_array()?;
    if items.len() != CHOICE_COUNT {
        return None;
    }

    let mut changed = false;
    let mut choices = Vec::with_capacity(CHOICE_COUNT);
    for (i, item) in items.iter().enumerate() {
        let original = item.as_str()?;
        let body = CHOICE_LABEL.replace(original, "");
        let body = body.trim();
        if body.is_empty() {
            return None;
        }
        let labelled = format!("{}. {}", label(i), body);
        changed |= labelled != original;
        choices.push(labelled);
    }

    let mut bodies: Vec<&str> = choices.iter().map(|c| c[3..].trim()).collect();
    bodies.sort_unstable();
    bodies.dedup();
    if bodies.len() != CHOICE_COUNT {
        return None;
    }

    Some((choices, changed))
}

/// Accepts 0-3 as a number, a digit string or a choice letter.
fn parse_correct(value: &Value) -> Option<usize> {
    let index = match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize)?,
        Value::String(s) => {
            let s = s.trim().trim_end_matches(['.', ')', ':']);
            match s.parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    let mut chars = s.chars();
                    let letter = chars.next()?.to_ascii_uppercase();
                    if chars.next().is_some() {
                        return None;
                    }
                    LABELS.iter().position(|l| *l == letter)?
                }
            }
        }
        _ => return None,
    };
    (index < CHOICE_COUNT).then_some(index)
}

/// Look up a per-choice entry under its numeric key, then its letter key.
fn lookup_choice<'a>(map: &'a Map<String, Value>, index: usize) -> Option<(&'a Value, bool)> {
    if let Some(v) = map.get(&index.to_string()) {
        return Some((v, false));
    }
    let upper = LABELS[index].to_string();
    let lower = upper.to_lowercase();
    map.get(&upper).or_else(|| map.get(&lower)).map(|v| (v, true))
}

fn is_choice_key(key: &str) -> bool {
    key.parse::<usize>().is_ok_and(|i| i < CHOICE_COUNT)
}

fn repair_explanations(
    value: Option<&Value>,
    correct: usize,
    topic: &str,
) -> (BTreeMap<usize, String>, bool) {
    let mut changed = false;
    let mut explanations = BTreeMap::new();

    match value {
        Some(Value::Object(map)) => {
            for i in 0..CHOICE_COUNT {
                let text = match lookup_choice(map, i) {
                    Some((Value::String(s), promoted)) if !s.trim().is_empty() => {
                        changed |= promoted;
                        s.clone()
                    }
                    _ => {
                        changed = true;
                        synthesized_explanation(i, correct, topic)
                    }
                };
                explanations.insert(i, text);
            }
            // Letter keys and anything else outside 0-3 are dropped.
            changed |= map.keys().any(|k| !is_choice_key(k));
        }
        Some(Value::Array(items)) => {
            changed = true;
            for i in 0..CHOICE_COUNT {
                let text = match items.get(i).and_then(Value::as_str) {
                    Some(s) if !s.trim().is_empty() => s.to_string(),
                    _ => synthesized_explanation(i, correct, topic),
                };
                explanations.insert(i, text);
            }
        }
        _ => {
            changed = true;
            for i in 0..CHOICE_COUNT {
                explanations.insert(i, synthesized_explanation(i, correct, topic));
            }
        }
    }

    (explanations, changed)
}

fn link_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        _ => None,
    }
}

fn repair_links(value: Option<&Value>) -> (BTreeMap<usize, Vec<String>>, bool) {
    let Some(Value::Object(map)) = value else {
        return (default_links(), true);
    };

    let mut changed = map.keys().any(|k| !is_choice_key(k));
    let mut links = BTreeMap::new();
    for i in 0..CHOICE_COUNT {
        let list = match lookup_choice(map, i) {
            Some((v, promoted)) => match link_list(v) {
                Some(list) => {
                    // A bare string becomes a one-element list.
                    changed |= promoted || !v.is_array() || v.as_array().map(Vec::len) != Some(list.len());
                    list
                }
                None => {
                    changed = true;
                    vec![DEFAULT_LINK.to_string()]
                }
            },
            None => {
                changed = true;
                vec![DEFAULT_LINK.to_string()]
            }
        };
        links.insert(i, list);
    }

    (links, changed)
}
