//! Text extraction from a downloaded resume.
//!
//! Extraction never fails the job: when the document cannot be read the
//! enhancer gets a pointer to the original file instead.

use std::path::PathBuf;

use tracing::{debug, warn};

/// Text sent to the enhancer when extraction fails.
pub fn fallback_text(file_url: &str) -> String {
    format!("The resume can be found at: {file_url}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    fn from_file_name(file_name: &str) -> Self {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "md" => DocumentKind::PlainText,
            _ => DocumentKind::Pdf,
        }
    }
}

/// Extracts the resume text at `path`, or returns [`fallback_text`].
///
/// PDF parsing is CPU-bound and can panic on malformed input, so it runs
/// inside `spawn_blocking` where a panic surfaces as a `JoinError`.
pub async fn extract_resume_text(path: PathBuf, file_name: &str, file_url: &str) -> String {
    let kind = DocumentKind::from_file_name(file_name);

    let extracted = tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => pdf_extract::extract_text(&path).map_err(|e| e.to_string()),
        DocumentKind::PlainText => std::fs::read(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| String::from_utf8(raw).map_err(|e| e.to_string())),
    })
    .await;

    match extracted {
        Ok(Ok(text)) if !text.trim().is_empty() => {
            debug!(chars = text.len(), "Extracted resume text from {file_name}");
            text
        }
        Ok(Ok(_)) => {
            warn!("No text found in {file_name}, using file reference instead");
            fallback_text(file_url)
        }
        Ok(Err(e)) => {
            warn!("Error extracting text from {file_name}: {e}");
            fallback_text(file_url)
        }
        Err(e) => {
            warn!("Text extraction for {file_name} aborted: {e}");
            fallback_text(file_url)
        }
    }
}
