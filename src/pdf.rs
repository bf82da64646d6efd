//! PDF text extraction for uploaded documents.

use tracing::{debug, instrument};

use crate::error::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Extract plain text from PDF bytes. Page breaks become newlines.
pub fn extract_text(bytes: &[u8]) -> Result<String, AppError> {
  if !bytes.starts_with(PDF_MAGIC) {
    return Err(AppError::Upload("file is not a PDF".into()));
  }
  let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| AppError::Pdf(e.to_string()))?;
  Ok(text.replace('\u{0C}', "\n"))
}

/// Run [`extract_text`] on the blocking pool. A panic inside the parser becomes `AppError::Pdf`.
#[instrument(level = "info", skip(bytes), fields(bytes = bytes.len()))]
pub async fn extract_text_blocking(bytes: Vec<u8>) -> Result<String, AppError> {
  let text = tokio::task::spawn_blocking(move || extract_text(&bytes))
    .await
    .map_err(|e| AppError::Pdf(format!("extraction task failed: {e}")))??;
  debug!(target: "summary", chars = text.chars().count(), "PDF text extracted");
  Ok(text)
}
