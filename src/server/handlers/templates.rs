//! Template catalog and draft generation endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::Template;

use super::workflows::WorkflowResponse;
use super::ApiError;
use crate::server::AppState;

/// GET /api/templates
pub async fn list_templates(State(state): State<AppState>) -> Json<Vec<Template>> {
    Json(state.templates.list().to_vec())
}

/// GET /api/templates/:template_id
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> Result<Json<Template>, ApiError> {
    let template = state.templates.get(&template_id)?;
    Ok(Json(template.clone()))
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub initiator: String,
    /// Review deadline; defaults to a week out.
    pub due_date: Option<NaiveDate>,
}

/// POST /api/templates/:template_id/draft
///
/// Drafting from a template opens a pending review workflow rather than
/// producing a document directly.
pub async fn generate_draft(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Json(request): Json<DraftRequest>,
) -> Result<(StatusCode, Json<WorkflowResponse>), ApiError> {
    let template = state.templates.get(&template_id)?;
    let due_date = request
        .due_date
        .unwrap_or_else(|| Utc::now().date_naive() + Duration::days(7));

    let item = state
        .tracker
        .create(
            format!("Draft: {}", template.title),
            request.initiator,
            due_date,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}
