//! PDF text extraction.
//!
//! Downloads are staged in a [`NamedTempFile`] that is removed when the fetch
//! returns, whether the download, the parse, or nothing at all failed.

use crate::error::{ResponderError, Result};
use crate::http::{Credential, HttpRequest, HttpTransport};
use crate::{log_debug, log_warn};
use lopdf::Document;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Appended to text cut at a length ceiling
pub const ELLIPSIS: &str = "...";

/// Where the document used for a prompt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    /// Attached to the discussion topic itself
    Attachment,
    /// Found in the course files
    CourseFolder,
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attachment => write!(f, "topic attachment"),
            Self::CourseFolder => write!(f, "course files"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub source: DocumentSource,
    pub url: String,
    pub text: String,
}

/// Extract plain text from in-memory PDF bytes
pub fn extract(pdf_bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(pdf_bytes).map_err(|e| ResponderError::Parse(e.to_string()))?;
    Ok(document_text(&document))
}

/// Extract plain text from a PDF on disk
pub fn extract_file(path: &Path) -> Result<String> {
    let document = Document::load(path).map_err(|e| ResponderError::Parse(e.to_string()))?;
    Ok(document_text(&document))
}

// Pages that fail to extract contribute nothing rather than failing the document
fn document_text(document: &Document) -> String {
    let pages = document.get_pages();
    log_debug!("Extracting text from {} PDF pages", pages.len());

    let mut text = String::new();
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                let page_text = page_text.trim();
                if !page_text.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(page_text);
                }
            }
            Err(e) => log_warn!("Skipping PDF page {}: {}", page_number, e),
        }
    }
    text
}

/// Cut `text` to at most `max_chars` characters, marking the cut with [`ELLIPSIS`]
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{ELLIPSIS}", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Downloads PDFs with the LMS credential and extracts their text.
#[derive(Clone)]
pub struct DocumentFetcher {
    transport: Arc<dyn HttpTransport>,
    credential: Credential,
    accepted_status: Vec<u16>,
    staging_dir: Option<PathBuf>,
    max_chars: usize,
}

impl DocumentFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credential: Credential,
        accepted_status: Vec<u16>,
        max_chars: usize,
    ) -> Self {
        Self {
            transport,
            credential,
            accepted_status,
            staging_dir: None,
            max_chars,
        }
    }

    /// Stage downloads in `dir` instead of the system temp directory
    pub fn with_staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    /// Download the PDF at `url` and return its text, truncated to the ceiling
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let request = HttpRequest::get(url).with_credential(&self.credential);
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status("Downloading document", &self.accepted_status)?;

        let mut staging = self.staging_file()?;
        staging.write_all(&response.body)?;
        staging.flush()?;
        log_debug!(
            "Staged {} bytes at {}",
            response.body.len(),
            staging.path().display()
        );

        let extracted = extract_file(staging.path());
        if let Err(e) = staging.close() {
            log_warn!("Failed to remove staging file: {}", e);
        }

        let text = extracted?;
        log_debug!("Extracted {} characters", text.chars().count());
        Ok(truncate(&text, self.max_chars))
    }

    fn staging_file(&self) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("canvas-responder-").suffix(".pdf");
        let file = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }
}
