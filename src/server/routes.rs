//! Router configuration for the API server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Dashboard
        .route("/api/status", get(handlers::api_status))
        // Document library
        .route("/api/documents", get(handlers::list_documents))
        .route("/api/documents/:doc_id", get(handlers::get_document))
        // Intake pipeline
        .route("/api/intake", post(handlers::begin_upload).get(handlers::list_in_flight))
        .route("/api/intake/:doc_id/progress", post(handlers::report_progress))
        .route("/api/intake/:doc_id/complete", post(handlers::complete_upload))
        .route("/api/intake/:doc_id/extraction", post(handlers::complete_extraction))
        .route("/api/intake/:doc_id/resolve", post(handlers::resolve_verification))
        // Workflows
        .route(
            "/api/workflows",
            get(handlers::list_workflows).post(handlers::create_workflow),
        )
        .route("/api/workflows/:item_id/approve", post(handlers::approve_workflow))
        .route("/api/workflows/:item_id/reject", post(handlers::reject_workflow))
        // Assistant
        .route("/api/chat", post(handlers::chat_turn))
        .route("/api/chat/:conversation_id", get(handlers::get_conversation))
        // Templates
        .route("/api/templates", get(handlers::list_templates))
        .route("/api/templates/:template_id", get(handlers::get_template))
        .route("/api/templates/:template_id/draft", post(handlers::generate_draft))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
