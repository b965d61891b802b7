//! Intake pipeline endpoints.
//!
//! `POST /api/intake` accepts file metadata and opens an ingestion; the
//! progress/complete/extraction callbacks are how upload and OCR
//! collaborators drive the state machine over HTTP.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::ingest::{ExtractionOutcome, UploadRequest, VerificationDecision};

use super::documents::DocumentResponse;
use super::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub id: String,
    pub status: String,
}

/// POST /api/intake
pub async fn begin_upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<(StatusCode, Json<IntakeResponse>), ApiError> {
    let id = state.pipeline.begin_upload(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(IntakeResponse {
            id,
            status: "uploading".to_string(),
        }),
    ))
}

/// GET /api/intake
pub async fn list_in_flight(
    State(state): State<AppState>,
) -> Json<Vec<DocumentResponse>> {
    let docs = state.pipeline.in_flight().await;
    Json(docs.into_iter().map(DocumentResponse::from).collect())
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    /// Percentage points to advance by.
    pub delta: u8,
}

/// POST /api/intake/:doc_id/progress
///
/// Always 204: late or misdirected progress reports are dropped, not errors.
pub async fn report_progress(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(request): Json<ProgressRequest>,
) -> StatusCode {
    state.pipeline.report_progress(&doc_id, request.delta).await;
    StatusCode::NO_CONTENT
}

/// POST /api/intake/:doc_id/complete
pub async fn complete_upload(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    state.pipeline.complete_upload(&doc_id).await?;
    let doc = state
        .pipeline
        .document(&doc_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("document '{}' not found", doc_id)))?;
    Ok(Json(doc.into()))
}

#[derive(Debug, Deserialize)]
pub struct ExtractionRequest {
    pub text: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
    pub confidence: f32,
}

/// POST /api/intake/:doc_id/extraction
///
/// Callback for the OCR collaborator reporting its outcome.
pub async fn complete_extraction(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(request): Json<ExtractionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = ExtractionOutcome {
        text: request.text,
        fields: request.fields,
        confidence: request.confidence,
    };
    let status = state.pipeline.complete_extraction(&doc_id, outcome).await?;
    Ok(Json(json!({ "id": doc_id, "status": status.as_str() })))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub decision: VerificationDecision,
}

/// POST /api/intake/:doc_id/resolve
pub async fn resolve_verification(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state
        .pipeline
        .resolve_verification(&doc_id, request.decision)
        .await?;
    Ok(Json(json!({ "id": doc_id, "status": status.as_str() })))
}
