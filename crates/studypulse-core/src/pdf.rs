//! Text extraction from uploaded study material.

use thiserror::Error;

/// Magic bytes every PDF file starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Errors turning an uploaded document into plain text.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("uploaded file is not a PDF")]
    NotPdf,

    #[error("failed to parse PDF: {0}")]
    Extraction(String),

    #[error("PDF contains no extractable text")]
    Empty,
}

/// Something that can turn raw document bytes into clean text.
///
/// Extraction is CPU-bound; callers run it on a blocking thread.
pub trait DocumentExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DocumentError>;
}

/// Extracts text from PDF documents with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(DocumentError::NotPdf);
        }
        let raw = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DocumentError::Extraction(e.to_string()))?;
        let text = clean_text(&raw);
        if text.is_empty() {
            return Err(DocumentError::Empty);
        }
        Ok(text)
    }
}

/// Collapse every whitespace run (line breaks included) to a single space.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
