//! Assistant endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::{Conversation, Locale};

use super::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omit to start a new conversation.
    pub conversation_id: Option<String>,
    pub question: String,
    /// "en" or "ar"; switches the conversation language when given.
    pub language: Option<Locale>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub answer: String,
}

/// POST /api/chat
pub async fn chat_turn(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let conversation_id = match request.conversation_id {
        Some(id) => id,
        None => {
            let locale = request.language.unwrap_or_default();
            state.chat.start_conversation(locale).await.id
        }
    };

    let answer = state
        .chat
        .ask(&conversation_id, &request.question, request.language)
        .await?;

    Ok(Json(ChatResponse {
        conversation_id,
        answer,
    }))
}

/// GET /api/chat/:conversation_id
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    state
        .chat
        .conversation(&conversation_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!("conversation '{}' not found", conversation_id))
        })
}
