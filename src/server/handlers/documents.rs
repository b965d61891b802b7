//! Document library endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::{Document, DocumentStatus};
use crate::repository::DocumentFilter;

use super::ApiError;
use crate::server::AppState;

/// Query parameters for document listings.
#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    /// Filter by status (uploading, processing_ocr, categorized, ...).
    pub status: Option<String>,
    /// Filter by category.
    pub category: Option<String>,
    /// Substring search over name and extracted text.
    pub q: Option<String>,
}

/// Document response format. Extracted text is summarized to its length to
/// keep listings light.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_by: String,
    pub access_level: String,
    pub category: Option<String>,
    pub status: String,
    pub progress: u8,
    pub content_hash: Option<String>,
    pub extracted_chars: Option<usize>,
    pub confidence: Option<f32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            mime_type: doc.mime_type,
            size_bytes: doc.size_bytes,
            uploaded_by: doc.uploaded_by,
            access_level: doc.access_level.as_str().to_string(),
            category: doc.category,
            status: doc.status.as_str().to_string(),
            progress: doc.progress,
            content_hash: doc.content_hash,
            extracted_chars: doc.extraction.as_ref().map(|e| e.text.chars().count()),
            confidence: doc.extraction.as_ref().map(|e| e.confidence),
            created_at: doc.created_at.to_rfc3339(),
            updated_at: doc.updated_at.to_rfc3339(),
        }
    }
}

/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<DocumentsQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(DocumentStatus::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!("unknown status '{}'", raw))
        })?),
        None => None,
    };

    let filter = DocumentFilter {
        status,
        category: params.category,
        query: params.q,
    };
    let docs = state.documents.list(&filter).await?;
    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}

/// GET /api/documents/:doc_id
///
/// Falls back to the in-flight pipeline record for documents not yet
/// committed.
pub async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    if let Some(doc) = state.documents.get(&doc_id).await? {
        return Ok(Json(doc.into()));
    }
    if let Some(doc) = state.pipeline.document(&doc_id).await {
        return Ok(Json(doc.into()));
    }
    Err(ApiError::not_found(format!("document '{}' not found", doc_id)))
}
