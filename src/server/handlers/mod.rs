//! API handlers.

mod chat;
mod documents;
mod intake;
mod status;
mod templates;
mod workflows;

pub use chat::{chat_turn, get_conversation};
pub use documents::{get_document, list_documents};
pub use intake::{
    begin_upload, complete_extraction, complete_upload, list_in_flight, report_progress,
    resolve_verification,
};
pub use status::api_status;
pub use templates::{generate_draft, get_template, list_templates};
pub use workflows::{approve_workflow, create_workflow, list_workflows, reject_workflow};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::chat::ChatError;
use crate::ingest::IngestError;
use crate::templates::TemplateNotFound;
use crate::workflow::WorkflowError;

/// Error payload returned by every endpoint.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        let status = match &e {
            IngestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::InvalidTransition { .. } => StatusCode::CONFLICT,
            IngestError::UnknownDocument(_) => StatusCode::NOT_FOUND,
            IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        let status = match &e {
            WorkflowError::AlreadyResolved { .. } => StatusCode::CONFLICT,
            WorkflowError::UnknownItem(_) => StatusCode::NOT_FOUND,
            WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        let status = match &e {
            ChatError::EmptyQuestion => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::UnknownConversation(_) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<TemplateNotFound> for ApiError {
    fn from(e: TemplateNotFound) -> Self {
        Self::not_found(e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", e);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}
