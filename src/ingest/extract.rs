//! Plain-text extraction for the supported document formats.

use crate::chunking::DocType;
use crate::error::{QuizRagError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Extract the raw text of a document according to its type.
pub fn extract_text(path: &Path, doc_type: DocType) -> Result<String> {
    match doc_type {
        DocType::Pdf => extract_pdf(path),
        DocType::Docx => extract_docx(path),
        DocType::Text => std::fs::read_to_string(path).map_err(|e| QuizRagError::ingest(path, e)),
    }
}

/// Page-by-page text, joined with newlines. Unreadable pages are skipped.
pub fn extract_pdf(path: &Path) -> Result<String> {
    let document = lopdf::Document::load(path).map_err(|e| QuizRagError::ingest(path, e))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!("Skipping page {} of {}: {}", page_number, path.display(), e),
        }
    }

    if pages.is_empty() {
        return Err(QuizRagError::ingest(path, "no extractable text"));
    }

    debug!("Extracted {} pages from {}", pages.len(), path.display());
    Ok(pages.join("\n"))
}

/// Paragraph text of a Word document, one paragraph per line.
pub fn extract_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| QuizRagError::ingest(path, e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| QuizRagError::ingest(path, e))?
        .read_to_string(&mut xml)
        .map_err(|e| QuizRagError::ingest(path, e))?;

    docx_xml_to_text(&xml).map_err(|e| QuizRagError::ingest(path, e))
}

/// Collect `w:t` runs from WordprocessingML, ending every `w:p` with a newline.
pub fn docx_xml_to_text(xml: &str) -> std::result::Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
