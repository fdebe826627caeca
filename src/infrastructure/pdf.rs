use async_trait::async_trait;

use crate::domain::{has_pdf_signature, ports::TextExtractor, DomainError};

/// Extracts the text layer of a PDF. Image-only PDFs yield an empty string.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, DomainError> {
        if !has_pdf_signature(bytes) {
            return Err(DomainError::validation("Uploaded file is not a valid PDF"));
        }

        let bytes = bytes.to_vec();
        let size = bytes.len();
        tracing::info!(size, "loading PDF");

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| DomainError::internal(format!("PDF extraction task failed: {e}")))?
            .map_err(|e| {
                DomainError::unprocessable(format!("Failed to extract text from PDF: {e}"))
            })?;

        tracing::debug!(chars = text.chars().count(), "extracted PDF text");
        Ok(text)
    }
}
