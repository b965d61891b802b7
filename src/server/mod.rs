//! JSON API server for the vault.
//!
//! Exposes the document library, intake pipeline callbacks, workflow
//! decisions, the assistant, and the template catalog. Rendering is a client
//! concern; every endpoint speaks JSON.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::chat::ChatService;
use crate::config::Settings;
use crate::ingest::IngestionPipeline;
use crate::repository::DocumentRepository;
use crate::templates::TemplateCatalog;
use crate::workflow::WorkflowTracker;

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub documents: Arc<dyn DocumentRepository>,
    pub tracker: Arc<WorkflowTracker>,
    pub chat: Arc<ChatService>,
    pub templates: Arc<TemplateCatalog>,
}

/// Start the API server.
pub async fn serve(settings: &Settings, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr =
        format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::chat::{KeywordRetriever, LlmConfig, OllamaBackend};
    use crate::config::IntakeConfig;
    use crate::repository::{MemoryDocumentRepository, MemoryWorkflowRepository};

    fn test_app() -> axum::Router {
        let documents: Arc<dyn DocumentRepository> = Arc::new(MemoryDocumentRepository::new());
        let state = AppState {
            pipeline: Arc::new(IngestionPipeline::new(
                IntakeConfig::default(),
                documents.clone(),
            )),
            documents: documents.clone(),
            tracker: Arc::new(WorkflowTracker::new(Arc::new(
                MemoryWorkflowRepository::new(),
            ))),
            chat: Arc::new(ChatService::new(
                Arc::new(OllamaBackend::new(LlmConfig::default())),
                Arc::new(KeywordRetriever::new(documents)),
            )),
            templates: Arc::new(TemplateCatalog::new()),
        };
        create_router(state)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn intake_request() -> serde_json::Value {
        json!({
            "name": "NDA_TechCorp.pdf",
            "mime_type": "application/pdf",
            "size_bytes": 2_400_000,
            "uploaded_by": "sarah",
            "access_level": "lawyer",
        })
    }

    #[tokio::test]
    async fn test_api_intake_upload_flow() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(post_json("/api/intake", intake_request()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["status"], "uploading");
        let id = json["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(post_json(&format!("/api/intake/{}/complete", id), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "processing_ocr");
    }

    #[tokio::test]
    async fn test_api_intake_complete_twice_conflicts() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(post_json("/api/intake", intake_request()))
            .await
            .unwrap();
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let uri = format!("/api/intake/{}/complete", id);
        let response = app.clone().oneshot(post_json(&uri, json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The document already left the upload phase.
        let response = app.oneshot(post_json(&uri, json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("complete_upload"));
    }

    #[tokio::test]
    async fn test_api_chat_blank_question() {
        let app = test_app();

        let response = app
            .oneshot(post_json("/api/chat", json!({ "question": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_api_documents_unknown_status_filter() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/documents?status=bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("bogus"));
    }
}
