use anyhow::{Context, Result};
use pdf_extract::extract_text_from_mem;
use regex::Regex;
use std::sync::LazyLock;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Turns an uploaded PDF into the plain text that rides along with a chat request.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Validates and extracts on a blocking thread; a panicking parser surfaces as an error.
    pub async fn extract(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String> {
        self.validate(file_name, content_type, &bytes)?;

        let name = file_name.to_string();
        let text = tokio::task::spawn_blocking(move || Self::extract_blocking(&name, &bytes))
            .await
            .with_context(|| format!("PDF parser aborted on {file_name}"))??;

        log::info!("Parsed PDF {}: {} characters", file_name, text.chars().count());
        Ok(text)
    }

    /// Accepts only declared `application/pdf` uploads that start with the PDF header.
    pub fn validate(&self, file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<()> {
        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());
        if declared.as_deref() != Some(PDF_CONTENT_TYPE) {
            return Err(anyhow::anyhow!(
                "{} has content type {}, expected {}",
                file_name,
                content_type.unwrap_or("<none>"),
                PDF_CONTENT_TYPE
            ));
        }

        if !bytes.starts_with(PDF_MAGIC) {
            return Err(anyhow::anyhow!("{file_name} does not look like a PDF document"));
        }

        Ok(())
    }

    fn extract_blocking(file_name: &str, bytes: &[u8]) -> Result<String> {
        let raw = extract_text_from_mem(bytes)
            .map_err(|e| anyhow::anyhow!("failed to extract text from {file_name}: {e}"))?;
        Ok(normalize_text(&raw))
    }
}

/// Collapses every whitespace run, page breaks included, into one space.
pub fn normalize_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tiny_pdf;

    #[test]
    fn normalize_collapses_whitespace_and_page_breaks() {
        assert_eq!(
            normalize_text("  Page one\n\nline\ttwo \u{c}Page two  "),
            "Page one line two Page two"
        );
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[tokio::test]
    async fn rejects_wrong_content_type() {
        let processor = DocumentProcessor::new();
        let err = processor
            .extract("notes.txt", Some("text/plain"), b"%PDF-1.4".to_vec())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected application/pdf"));

        assert!(processor
            .extract("notes.pdf", None, b"%PDF-1.4".to_vec())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_bytes_without_pdf_header() {
        let processor = DocumentProcessor::new();
        let err = processor
            .extract("fake.pdf", Some("application/pdf"), b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not look like a PDF"));
    }

    #[tokio::test]
    async fn content_type_parameters_are_ignored() {
        let processor = DocumentProcessor::new();
        let text = processor
            .extract("doc.pdf", Some("Application/PDF; charset=binary"), tiny_pdf("Hello"))
            .await
            .unwrap();
        assert!(text.contains("Hello"), "extracted: {text:?}");
    }

    #[tokio::test]
    async fn extracts_text_from_generated_pdf() {
        let processor = DocumentProcessor::new();
        let text = processor
            .extract("doc.pdf", Some(PDF_CONTENT_TYPE), tiny_pdf("Quarterly revenue"))
            .await
            .unwrap();
        assert!(text.contains("Quarterly"), "extracted: {text:?}");
        assert!(!text.contains('\n'));
    }
}
