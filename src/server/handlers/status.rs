//! Dashboard status endpoint.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::models::WorkflowStatus;

use super::ApiError;
use crate::server::AppState;

/// Aggregate counts for the dashboard.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Committed documents grouped by status.
    pub documents: HashMap<String, u64>,
    /// Documents currently in the intake pipeline.
    pub in_flight: usize,
    /// Workflow items awaiting a decision.
    pub pending_workflows: usize,
    /// Open assistant conversations.
    pub active_conversations: usize,
}

/// GET /api/status
pub async fn api_status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let counts = state.documents.count_by_status().await?;
    let documents = counts
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();

    let in_flight = state
        .pipeline
        .in_flight()
        .await
        .iter()
        .filter(|d| !d.status.is_ingestion_terminal())
        .count();

    let pending_workflows = state
        .tracker
        .list(Some(WorkflowStatus::Pending))
        .await?
        .len();

    let active_conversations = state.chat.conversation_count().await;

    Ok(Json(StatusResponse {
        documents,
        in_flight,
        pending_workflows,
        active_conversations,
    }))
}
