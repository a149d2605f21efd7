//! Text chunking for breaking documents into searchable segments.
//!
//! Documents are split into overlapping, size-bounded chunks that cover the source
//! text without gaps.

mod recursive;

pub use recursive::{RecursiveSplitter, DEFAULT_SEPARATORS};

use serde::{Deserialize, Serialize};

/// Kind of source document a chunk was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Pdf,
    Docx,
    Text,
}

impl DocType {
    /// Detect the document type from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocType::Pdf),
            "docx" | "doc" => Some(DocType::Docx),
            "txt" | "md" => Some(DocType::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Pdf => "pdf",
            DocType::Docx => "docx",
            DocType::Text => "text",
        }
    }
}

impl std::str::FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(DocType::Pdf),
            "docx" => Ok(DocType::Docx),
            "text" | "txt" => Ok(DocType::Text),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous slice of source text with positional and topical metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk.
    pub content: String,
    /// Originating file path or identifier.
    pub source: String,
    /// Position within the source, 0-based.
    pub chunk_index: usize,
    /// Kind of source document.
    pub doc_type: DocType,
    /// Topic label inferred from the source name, or "General".
    pub topic: String,
}
