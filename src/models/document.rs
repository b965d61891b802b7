//! Document models for the legal document vault.
//!
//! A document is created the moment a file is accepted for intake and
//! carries its ingestion status through upload, OCR, and categorization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ingestion status of a document.
///
/// The ingestion lifecycle is `Uploading -> ProcessingOcr ->
/// {Categorized | RequiresVerification}`, with `RequiresVerification`
/// resolving to `Categorized` or `Rejected` after human review.
/// `PendingReview` and `Approved` belong to the downstream sign-off
/// workflow, not to ingestion itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploading,
    ProcessingOcr,
    Categorized,
    RequiresVerification,
    Rejected,
    PendingReview,
    Approved,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::ProcessingOcr => "processing_ocr",
            Self::Categorized => "categorized",
            Self::RequiresVerification => "requires_verification",
            Self::Rejected => "rejected",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploading" => Some(Self::Uploading),
            "processing_ocr" => Some(Self::ProcessingOcr),
            "categorized" => Some(Self::Categorized),
            "requires_verification" => Some(Self::RequiresVerification),
            "rejected" => Some(Self::Rejected),
            "pending_review" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }

    /// Whether progress reports are meaningful in this status.
    ///
    /// Progress only moves during the upload and OCR phases; reports
    /// arriving in any other status are dropped by the pipeline.
    pub fn accepts_progress(&self) -> bool {
        matches!(self, Self::Uploading | Self::ProcessingOcr)
    }

    /// Whether this status ends the ingestion attempt.
    pub fn is_ingestion_terminal(&self) -> bool {
        matches!(self, Self::Categorized | Self::Rejected)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level of the uploading user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Admin,
    Lawyer,
    Paralegal,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Lawyer => "lawyer",
            Self::Paralegal => "paralegal",
        }
    }
}

/// Output of the extraction worker, attached once OCR completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// Full extracted text content.
    pub text: String,
    /// Structured fields pulled from the document (dates, parties, amounts).
    pub fields: HashMap<String, String>,
    /// Extraction confidence in [0, 1].
    pub confidence: f32,
    /// When extraction finished.
    pub extracted_at: DateTime<Utc>,
}

/// A legal document tracked through intake and storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier for this document.
    pub id: String,
    /// Display name (usually the original filename).
    pub name: String,
    /// MIME type of the uploaded content.
    pub mime_type: String,
    /// Size in bytes as declared at intake.
    pub size_bytes: u64,
    /// Identity of the uploader.
    pub uploaded_by: String,
    /// Access level of the uploader.
    pub access_level: AccessLevel,
    /// Category assigned during or after ingestion (Contract, HR, Litigation...).
    pub category: Option<String>,
    /// Current ingestion status.
    pub status: DocumentStatus,
    /// Upload/OCR progress percentage, meaningful only while
    /// `status.accepts_progress()`.
    pub progress: u8,
    /// Content hash referencing the stored blob, once bytes are persisted.
    pub content_hash: Option<String>,
    /// Extraction output, present once OCR has run.
    pub extraction: Option<Extraction>,
    /// When the document record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document at the start of ingestion.
    pub fn new(
        id: String,
        name: String,
        mime_type: String,
        size_bytes: u64,
        uploaded_by: String,
        access_level: AccessLevel,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            mime_type,
            size_bytes,
            uploaded_by,
            access_level,
            category: None,
            status: DocumentStatus::Uploading,
            progress: 0,
            content_hash: None,
            extraction: None,
            created_at: now,
            updated_at: now,
        }
    }
}
