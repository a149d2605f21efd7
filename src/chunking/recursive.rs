//! Recursive separator-based text splitting.
//!
//! Text is cut at the highest-priority separator that occurs in it (paragraph, line,
//! sentence, word, then raw characters) until every piece fits. Neighbouring pieces are
//! merged back up to the size budget and each chunk then carries the last
//! `chunk_overlap` characters of the text that precedes it.

use crate::error::{QuizRagError, Result};

/// Separators tried in priority order. The empty separator means "split anywhere".
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Overlapping, size-bounded text splitter.
///
/// Guarantees, for non-empty input:
/// - every chunk has at most `chunk_size` characters;
/// - the first chunk starts at the beginning of the text, the last one ends at its end;
/// - every later chunk begins with exactly the last `chunk_overlap` characters of the
///   previous chunk, so dropping that prefix and concatenating rebuilds the text.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Create a splitter. `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(QuizRagError::Config(format!(
                "Invalid chunking parameters: size {} overlap {}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator list.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into overlapping chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|(start, end)| text[start..end].to_string())
            .collect()
    }

    /// Byte ranges of each chunk within `text`, overlap included.
    pub fn split_spans(&self, text: &str) -> Vec<(usize, usize)> {
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![(0, text.len())];
        }

        // New material per chunk; the rest of the chunk is the carried overlap.
        let budget = self.chunk_size - self.chunk_overlap;
        let mut segments = Vec::new();
        self.split_recursive(text, 0, text.len(), &self.separators, budget, &mut segments);

        // A leading segment shorter than the overlap cannot seed it; fold it forward.
        // The folded pieces stay under `chunk_size` since they carry no overlap prefix.
        while segments.len() > 1 && char_len(&text[segments[0].0..segments[0].1]) < self.chunk_overlap {
            let first = segments.remove(0);
            segments[0].0 = first.0;
        }

        segments
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| {
                if i == 0 {
                    (start, end)
                } else {
                    (back_chars(text, start, self.chunk_overlap), end)
                }
            })
            .collect()
    }

    fn split_recursive(
        &self,
        text: &str,
        start: usize,
        end: usize,
        separators: &[String],
        budget: usize,
        out: &mut Vec<(usize, usize)>,
    ) {
        let piece = &text[start..end];
        if char_len(piece) <= budget {
            out.push((start, end));
            return;
        }

        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || piece.contains(sep.as_str()));

        let (separator, remaining) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &separators[separators.len()..]),
        };

        if separator.is_empty() {
            hard_split(text, start, end, budget, out);
            return;
        }

        // Separators stay attached to the piece they terminate so pieces tile the text.
        let mut parts = Vec::new();
        let mut cursor = start;
        for (offset, matched) in piece.match_indices(separator) {
            let part_end = start + offset + matched.len();
            parts.push((cursor, part_end));
            cursor = part_end;
        }
        if cursor < end {
            parts.push((cursor, end));
        }

        let mut pending: Option<(usize, usize)> = None;
        for (part_start, part_end) in parts {
            if char_len(&text[part_start..part_end]) > budget {
                if let Some(span) = pending.take() {
                    out.push(span);
                }
                self.split_recursive(text, part_start, part_end, remaining, budget, out);
                continue;
            }

            pending = match pending {
                Some((merged_start, _)) if char_len(&text[merged_start..part_end]) <= budget => {
                    Some((merged_start, part_end))
                }
                Some(span) => {
                    out.push(span);
                    Some((part_start, part_end))
                }
                None => Some((part_start, part_end)),
            };
        }
        if let Some(span) = pending {
            out.push(span);
        }
    }
}

/// Cut a span into windows of `budget` characters.
fn hard_split(text: &str, start: usize, end: usize, budget: usize, out: &mut Vec<(usize, usize)>) {
    let mut window_start = start;
    let mut count = 0;
    for (offset, _) in text[start..end].char_indices() {
        if count == budget {
            out.push((window_start, start + offset));
            window_start = start + offset;
            count = 0;
        }
        count += 1;
    }
    if window_start < end {
        out.push((window_start, end));
    }
}

/// Byte index `n` characters before `index`, clamped to the start of the text.
fn back_chars(text: &str, index: usize, n: usize) -> usize {
    if n == 0 {
        return index;
    }
    text[..index]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(index)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
