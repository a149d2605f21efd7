//! Document ingestion: text extraction, cleaning, topic tagging and chunking.

mod extract;

pub use extract::{docx_xml_to_text, extract_docx, extract_pdf, extract_text};

use crate::chunking::{Chunk, DocType, RecursiveSplitter};
use crate::error::{QuizRagError, Result};
use crate::vector_store::VectorIndex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

/// Topic assigned when no filename pattern matches.
pub const DEFAULT_TOPIC: &str = "General";

/// Filename substrings and the topic they map to. First match wins, so longer
/// patterns come before their prefixes.
const TOPIC_PATTERNS: &[(&str, &str)] = &[
    ("cardiovascular", "Cardiovascular and pulmonary systems"),
    ("cardio", "Cardiovascular and pulmonary systems"),
    ("musculoskeletal", "Musculoskeletal system"),
    ("musculo", "Musculoskeletal system"),
    ("neuromuscular", "Neuromuscular and nervous systems"),
    ("neuro", "Neuromuscular and nervous systems"),
    ("integumentary", "Integumentary system"),
    ("metabolic", "Metabolic and endocrine systems"),
    ("endocrine", "Metabolic and endocrine systems"),
    ("gastrointestinal", "Gastrointestinal system"),
    ("gi", "Gastrointestinal system"),
    ("genitourinary", "Genitourinary system"),
    ("gu", "Genitourinary system"),
    ("lymphatic", "Lymphatic system"),
    ("system", "System interactions"),
];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:\-()]").expect("Invalid regex"));

/// Infer a topic label from a file name (the directory part is ignored).
pub fn infer_topic(path: impl AsRef<Path>) -> &'static str {
    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    TOPIC_PATTERNS
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|(_, topic)| *topic)
        .unwrap_or(DEFAULT_TOPIC)
}

/// Collapse whitespace runs and drop characters outside the safe punctuation set.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    UNSAFE_CHARS.replace_all(&collapsed, "").trim().to_string()
}

/// Outcome of a directory ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub documents_failed: usize,
    pub chunks_created: usize,
}

/// Turns files on disk into tagged chunks.
#[derive(Debug, Clone)]
pub struct DocumentIngestor {
    splitter: RecursiveSplitter,
}

impl DocumentIngestor {
    pub fn new(splitter: RecursiveSplitter) -> Self {
        Self { splitter }
    }

    /// Ingestor with the given chunk size and overlap.
    pub fn with_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Ok(Self::new(RecursiveSplitter::new(chunk_size, chunk_overlap)?))
    }

    pub fn splitter(&self) -> &RecursiveSplitter {
        &self.splitter
    }

    /// Extract, clean and chunk one file.
    ///
    /// Unsupported extensions are an `InvalidInput` error; directory ingestion checks
    /// the extension first and skips those files.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn process(&self, path: &Path) -> Result<Vec<Chunk>> {
        let doc_type = doc_type_of(path).ok_or_else(|| {
            QuizRagError::InvalidInput(format!("Unsupported file type: {}", path.display()))
        })?;

        let raw = extract_text(path, doc_type)?;
        Ok(self.chunk_text(&raw, &path.display().to_string(), doc_type, infer_topic(path)))
    }

    /// Clean and chunk already extracted text.
    pub fn chunk_text(&self, raw: &str, source: &str, doc_type: DocType, topic: &str) -> Vec<Chunk> {
        let cleaned = clean_text(raw);
        self.splitter
            .split(&cleaned)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                source: source.to_string(),
                chunk_index,
                doc_type,
                topic: topic.to_string(),
            })
            .collect()
    }

    /// Walk `dir` recursively and chunk every supported file.
    ///
    /// Unreadable files are logged and counted as failed; the walk continues.
    pub fn collect_directory(&self, dir: &Path) -> Result<(Vec<Chunk>, IngestReport)> {
        if !dir.is_dir() {
            return Err(QuizRagError::InvalidInput(format!(
                "Directory does not exist: {}",
                dir.display()
            )));
        }

        let mut report = IngestReport::default();
        let mut chunks = Vec::new();

        let files: Vec<PathBuf> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable directory entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        for path in files {
            if doc_type_of(&path).is_none() {
                info!("Skipping unsupported file: {}", path.display());
                report.documents_skipped += 1;
                continue;
            }

            match self.process(&path) {
                Ok(file_chunks) => {
                    info!("Processed {} -> {} chunks", path.display(), file_chunks.len());
                    report.documents_processed += 1;
                    report.chunks_created += file_chunks.len();
                    chunks.extend(file_chunks);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    report.documents_failed += 1;
                }
            }
        }

        Ok((chunks, report))
    }

    /// Ingest a directory tree and store all chunks in one batch.
    ///
    /// File errors are tolerated; index errors abort and propagate.
    #[instrument(skip(self, index), fields(dir = %dir.display()))]
    pub async fn load_documents_from_directory(
        &self,
        dir: &Path,
        index: &VectorIndex,
    ) -> Result<IngestReport> {
        let ingestor = self.clone();
        let owned_dir = dir.to_path_buf();
        let (chunks, report) =
            tokio::task::spawn_blocking(move || ingestor.collect_directory(&owned_dir))
                .await
                .map_err(|e| QuizRagError::ingest(dir, e))??;

        index.upsert(&chunks).await?;

        info!(
            "Ingested {} documents ({} chunks), {} skipped, {} failed",
            report.documents_processed,
            report.chunks_created,
            report.documents_skipped,
            report.documents_failed
        );
        Ok(report)
    }
}

fn doc_type_of(path: &Path) -> Option<DocType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocType::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_topic() {
        assert_eq!(
            infer_topic("cardiovascular_systems_notes.pdf"),
            "Cardiovascular and pulmonary systems"
        );
        assert_eq!(infer_topic("random_file.txt"), "General");
        assert_eq!(infer_topic("Neuro_Review.DOCX"), "Neuromuscular and nervous systems");
        assert_eq!(infer_topic("endocrine.md"), "Metabolic and endocrine systems");
        assert_eq!(infer_topic("body_systems.txt"), "System interactions");
    }

    #[test]
    fn test_infer_topic_ignores_directories() {
        assert_eq!(infer_topic("/data/cardio/random_file.txt"), "General");
        assert_eq!(infer_topic("/data/misc/lymphatic.pdf"), "Lymphatic system");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("  Heart\trate:\n\n 72 bpm (rest) — normal!  "),
            "Heart rate: 72 bpm (rest)  normal!"
        );
        assert_eq!(clean_text("a*b#c"), "abc");
        assert_eq!(clean_text("Ärzte, Größe."), "Ärzte, Größe.");
    }

    #[test]
    fn test_chunk_text_tags_metadata() {
        let ingestor = DocumentIngestor::with_chunking(100, 20).unwrap();
        let raw = "Stroke volume rises with exercise. ".repeat(20);
        let chunks = ingestor.chunk_text(&raw, "gi.txt", DocType::Text, "Gastrointestinal system");

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.source, "gi.txt");
            assert_eq!(chunk.topic, "Gastrointestinal system");
            assert!(chunk.content.chars().count() <= 100);
        }
    }

    #[test]
    fn test_collect_directory_skips_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cardio.txt"), "Cardiac output is rate times volume.").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::write(dir.path().join("broken.pdf"), "not a pdf").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("lymphatic.md"), "Lymph drains to nodes.").unwrap();

        let ingestor = DocumentIngestor::with_chunking(800, 100).unwrap();
        let (chunks, report) = ingestor.collect_directory(dir.path()).unwrap();

        assert_eq!(
            report,
            IngestReport {
                documents_processed: 2,
                documents_skipped: 1,
                documents_failed: 1,
                chunks_created: 2,
            }
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].topic, "Cardiovascular and pulmonary systems");
        assert_eq!(chunks[1].topic, "Lymphatic system");
    }

    #[test]
    fn test_missing_directory_is_invalid_input() {
        let ingestor = DocumentIngestor::with_chunking(800, 100).unwrap();
        let err = ingestor
            .collect_directory(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, QuizRagError::InvalidInput(_)));
    }

    #[test]
    fn test_process_rejects_unsupported() {
        let ingestor = DocumentIngestor::with_chunking(800, 100).unwrap();
        assert!(ingestor.process(Path::new("slides.pptx")).is_err());
    }
}
