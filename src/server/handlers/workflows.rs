//! Workflow review endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{WorkflowItem, WorkflowStatus};

use super::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct WorkflowsQuery {
    /// Filter by status (pending, approved, rejected).
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub title: String,
    pub initiator: String,
    pub status: String,
    pub due_date: NaiveDate,
    pub overdue: bool,
    pub reason: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<WorkflowItem> for WorkflowResponse {
    fn from(item: WorkflowItem) -> Self {
        let overdue = item.is_overdue(Utc::now().date_naive());
        Self {
            id: item.id,
            title: item.title,
            initiator: item.initiator,
            status: item.status.as_str().to_string(),
            due_date: item.due_date,
            overdue,
            reason: item.reason,
            created_at: item.created_at.to_rfc3339(),
            resolved_at: item.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// GET /api/workflows
pub async fn list_workflows(
    State(state): State<AppState>,
    Query(params): Query<WorkflowsQuery>,
) -> Result<Json<Vec<WorkflowResponse>>, ApiError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(WorkflowStatus::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!("unknown status '{}'", raw))
        })?),
        None => None,
    };
    let items = state.tracker.list(status).await?;
    Ok(Json(items.into_iter().map(WorkflowResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub title: String,
    pub initiator: String,
    pub due_date: NaiveDate,
}

/// POST /api/workflows
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowResponse>), ApiError> {
    let item = state
        .tracker
        .create(request.title, request.initiator, request.due_date)
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// POST /api/workflows/:item_id/approve
pub async fn approve_workflow(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let item = state.tracker.approve(&item_id).await?;
    Ok(Json(item.into()))
}

#[derive(Debug, Deserialize, Default)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

/// POST /api/workflows/:item_id/reject
pub async fn reject_workflow(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    request: Option<Json<RejectRequest>>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let reason = request.and_then(|Json(r)| r.reason);
    let item = state.tracker.reject(&item_id, reason).await?;
    Ok(Json(item.into()))
}
