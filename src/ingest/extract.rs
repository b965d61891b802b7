//! Text extraction from uploaded documents.
//!
//! The `ExtractionBackend` trait is the OCR seam: the pipeline only sees an
//! `ExtractionOutcome` with text, structured fields, and a confidence score
//! in [0, 1]. The bundled backend shells out to pdftotext and Tesseract;
//! anything else (hosted OCR, a different engine) plugs in behind the trait.

use std::collections::HashMap;
use std::io::Write;
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::DocumentStatus;
use crate::storage::BlobStore;

use super::error::IngestError;
use super::pipeline::IngestionPipeline;

/// What the extraction worker produced for one document.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Extracted text content.
    pub text: String,
    /// Structured fields recognized in the text.
    pub fields: HashMap<String, String>,
    /// Confidence in [0, 1]; the pipeline clamps out-of-range values.
    pub confidence: f32,
}

impl ExtractionOutcome {
    /// Outcome used when extraction failed outright. Confidence 0 routes the
    /// document to human verification, the same remediation as a low-quality
    /// extraction.
    pub fn failed() -> Self {
        Self {
            text: String::new(),
            fields: HashMap::new(),
            confidence: 0.0,
        }
    }
}

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A backend that can turn document bytes into text and fields.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn extract(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<ExtractionOutcome, ExtractionError>;
}

/// Handle command output, extracting stdout on success.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "{}: {}",
                    tool_name, stderr
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Text extractor that uses external tools (pdftotext, tesseract).
pub struct ToolExtractor {
    /// Tesseract language setting.
    tesseract_lang: String,
}

impl Default for ToolExtractor {
    fn default() -> Self {
        Self {
            // Firm handles both English and Arabic documents.
            tesseract_lang: "eng+ara".to_string(),
        }
    }
}

impl ToolExtractor {
    pub fn new(tesseract_lang: impl Into<String>) -> Self {
        Self {
            tesseract_lang: tesseract_lang.into(),
        }
    }

    /// Check whether the required binaries are on PATH.
    pub fn available_tools() -> Vec<&'static str> {
        ["pdftotext", "tesseract"]
            .into_iter()
            .filter(|tool| which::which(tool).is_ok())
            .collect()
    }

    fn extract_pdf(content: &[u8]) -> Result<String, ExtractionError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(content)?;
        let result = Command::new("pdftotext")
            .arg("-layout")
            .arg(file.path())
            .arg("-")
            .output();
        handle_cmd_output(result, "pdftotext")
    }

    fn extract_image(content: &[u8], lang: &str) -> Result<String, ExtractionError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(content)?;
        let result = Command::new("tesseract")
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .output();
        handle_cmd_output(result, "tesseract")
    }
}

#[async_trait]
impl ExtractionBackend for ToolExtractor {
    async fn extract(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        // Trust the content over the declared type when they disagree.
        let mime = match infer::get(content) {
            Some(kind) if kind.mime_type() != mime_type => {
                debug!(
                    "Declared type {} but content looks like {}",
                    mime_type,
                    kind.mime_type()
                );
                kind.mime_type().to_string()
            }
            _ => mime_type.to_string(),
        };

        let (text, base_confidence) = match mime.as_str() {
            "application/pdf" => {
                let content = content.to_vec();
                let text =
                    tokio::task::spawn_blocking(move || Self::extract_pdf(&content))
                        .await
                        .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))??;
                (text, 0.95)
            }
            m if m.starts_with("image/") => {
                let content = content.to_vec();
                let lang = self.tesseract_lang.clone();
                let text =
                    tokio::task::spawn_blocking(move || Self::extract_image(&content, &lang))
                        .await
                        .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))??;
                (text, 0.80)
            }
            "text/plain" => (
                String::from_utf8_lossy(content).to_string(),
                0.99,
            ),
            other => return Err(ExtractionError::UnsupportedFileType(other.to_string())),
        };

        let confidence = base_confidence * text_quality(&text);
        let fields = recognize_fields(&text);
        Ok(ExtractionOutcome {
            text,
            fields,
            confidence,
        })
    }
}

/// Score extracted text quality in [0, 1].
///
/// Empty output scores 0. Otherwise the score starts from the ratio of
/// ordinary characters (alphanumeric, whitespace, punctuation), gets pulled
/// down by replacement characters, and is penalized when the average word
/// length falls outside the range of natural-language text.
pub fn text_quality(text: &str) -> f32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let total = trimmed.chars().count() as f32;
    let ordinary = trimmed
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || c.is_ascii_punctuation())
        .count() as f32;
    let garbled = trimmed.chars().filter(|&c| c == '\u{FFFD}').count() as f32;

    let words = trimmed.split_whitespace().count().max(1) as f32;
    let avg_word_len = total / words;

    let mut score = ordinary / total - (garbled / total) * 2.0;
    if !(2.0..=14.0).contains(&avg_word_len) {
        score -= 0.25;
    }
    score.clamp(0.0, 1.0)
}

/// Pull simple structured fields out of extracted text.
///
/// Recognizes the first ISO-style date as `date` and assigns a library
/// `category` by keyword. Deeper field extraction (parties, amounts) is the
/// job of a smarter collaborator.
pub fn recognize_fields(text: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();

    let date_re = regex::Regex::new(r"\b(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})\b")
        .expect("static regex");
    if let Some(m) = date_re.find(text) {
        fields.insert("date".to_string(), m.as_str().to_string());
    }

    if let Some(category) = categorize(text) {
        fields.insert("category".to_string(), category.to_string());
    }

    fields
}

/// Keyword categorization matching the library's category set.
fn categorize(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let rules: &[(&[&str], &str)] = &[
        (&["court", "summons", "litigation", "claim"], "Litigation"),
        (&["employment", "employee", "labour"], "HR"),
        (&["lease", "tenant", "premises"], "Real Estate"),
        (&["non-disclosure", "confidentiality", "agreement", "contract"], "Contract"),
    ];
    for (keywords, category) in rules {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some(category);
        }
    }
    None
}

/// Drives an extraction backend for documents in the OCR phase.
///
/// Fetches the stored blob, runs the backend, and feeds the outcome to the
/// pipeline. A failed extraction is reported as confidence 0 so the document
/// lands in `RequiresVerification` instead of being dropped.
pub struct ExtractionWorker {
    backend: Arc<dyn ExtractionBackend>,
    blobs: Arc<dyn BlobStore>,
}

impl ExtractionWorker {
    pub fn new(backend: Arc<dyn ExtractionBackend>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { backend, blobs }
    }

    /// Run extraction for one document and record the result.
    pub async fn process(
        &self,
        pipeline: &IngestionPipeline,
        document_id: &str,
    ) -> Result<DocumentStatus, IngestError> {
        let doc = pipeline
            .document(document_id)
            .await
            .ok_or_else(|| IngestError::UnknownDocument(document_id.to_string()))?;

        let outcome = match &doc.content_hash {
            Some(hash) => match self.blobs.get(hash, &doc.mime_type).await {
                Ok(content) => match self.backend.extract(&content, &doc.mime_type).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(document = %document_id, "Extraction failed: {}", e);
                        ExtractionOutcome::failed()
                    }
                },
                Err(e) => {
                    warn!(document = %document_id, "Blob fetch failed: {}", e);
                    ExtractionOutcome::failed()
                }
            },
            None => {
                warn!(document = %document_id, "No stored content to extract");
                ExtractionOutcome::failed()
            }
        };

        pipeline.complete_extraction(document_id, outcome).await
    }
}
