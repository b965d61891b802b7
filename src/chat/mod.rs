//! The retrieval-augmented legal assistant.
//!
//! One `ask` call is one turn: append the user message, retrieve document
//! context, call the generative backend, append the assistant message. Any
//! backend failure degrades to a fixed fallback answer so the conversation
//! stays usable; retry with backoff is a known gap left to callers that
//! need it.

mod generative;
mod prompt;
mod retrieval;

pub use generative::{GenerativeBackend, LlmConfig, LlmError, OllamaBackend};
pub use prompt::{build_prompt, SYSTEM_INSTRUCTION};
pub use retrieval::{ContextRetriever, KeywordRetriever};

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::models::{ChatMessage, ChatRole, Conversation, Locale};

/// Answer returned when the generative backend fails for any reason.
pub const FALLBACK_RESPONSE: &str = "The AI Legal Assistant is temporarily \
unavailable. Please try again in a moment; your conversation has been kept.";

/// Errors reported to the caller of `ask`.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Empty or whitespace-only question. Nothing is appended to the
    /// conversation and no collaborator is invoked.
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),
}

/// Conversation manager for the assistant.
///
/// Each conversation is guarded by its own lock, so turns within one
/// conversation serialize while different conversations proceed
/// independently. Overlapping `ask` calls on the same conversation complete
/// in lock order; callers that care about strict question/answer ordering
/// should issue turns sequentially.
pub struct ChatService {
    backend: Arc<dyn GenerativeBackend>,
    retriever: Arc<dyn ContextRetriever>,
    conversations: RwLock<HashMap<String, Arc<Mutex<Conversation>>>>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn GenerativeBackend>, retriever: Arc<dyn ContextRetriever>) -> Self {
        Self {
            backend,
            retriever,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new conversation seeded with the welcome message.
    pub async fn start_conversation(&self, locale: Locale) -> Conversation {
        let conv = Conversation::new(locale);
        let snapshot = conv.clone();
        self.conversations
            .write()
            .await
            .insert(conv.id.clone(), Arc::new(Mutex::new(conv)));
        snapshot
    }

    /// Number of open conversations.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Snapshot of a conversation.
    pub async fn conversation(&self, id: &str) -> Option<Conversation> {
        let conv = self.conversations.read().await.get(id).cloned()?;
        let conv = conv.lock().await;
        Some(conv.clone())
    }

    /// Ask one question in a conversation.
    ///
    /// `locale` switches the conversation language when given (the UI
    /// exposes an English/Arabic toggle mid-conversation). The turn always
    /// appends exactly one user and one assistant message, even when the
    /// backend fails and the fallback answer is used.
    pub async fn ask(
        &self,
        conversation_id: &str,
        question: &str,
        locale: Option<Locale>,
    ) -> Result<String, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let conv = self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.to_string()))?;
        let mut conv = conv.lock().await;

        if let Some(locale) = locale {
            conv.locale = locale;
        }
        conv.push(ChatMessage::new(ChatRole::User, question));

        let context = match self.retriever.retrieve(question).await {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(conversation = %conversation_id, "Context retrieval failed: {}", e);
                Vec::new()
            }
        };

        let prompt = build_prompt(question, conv.locale, &context, &conv.messages);
        let answer = match self.backend.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(conversation = %conversation_id, "Generative backend failed: {}", e);
                FALLBACK_RESPONSE.to_string()
            }
        };

        conv.push(ChatMessage::new(ChatRole::Assistant, answer.clone()));
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoBackend;

    #[async_trait]
    impl GenerativeBackend for EchoBackend {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            Ok(format!("echo: {} chars", prompt.len()))
        }
        async fn is_available(&self) -> bool {
            true
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerativeBackend for FailingBackend {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Connection("connection refused".into()))
        }
        async fn is_available(&self) -> bool {
            false
        }
    }

    struct NoContext;

    #[async_trait]
    impl ContextRetriever for NoContext {
        async fn retrieve(&self, _query: &str) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn service(backend: Arc<dyn GenerativeBackend>) -> ChatService {
        ChatService::new(backend, Arc::new(NoContext))
    }

    #[tokio::test]
    async fn test_turn_appends_user_and_assistant() {
        let svc = service(Arc::new(EchoBackend));
        let conv = svc.start_conversation(Locale::En).await;

        let answer = svc
            .ask(&conv.id, "What is the notice period?", None)
            .await
            .unwrap();
        assert!(answer.starts_with("echo:"));

        let conv = svc.conversation(&conv.id).await.unwrap();
        // welcome + user + assistant
        assert_eq!(conv.messages.len(), 3);
        assert_eq!(conv.messages[1].role, ChatRole::User);
        assert_eq!(conv.messages[2].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_backend_failure_yields_fallback_and_keeps_history() {
        let svc = service(Arc::new(FailingBackend));
        let conv = svc.start_conversation(Locale::En).await;

        let answer = svc
            .ask(&conv.id, "What is the notice period?", None)
            .await
            .unwrap();
        assert_eq!(answer, FALLBACK_RESPONSE);

        let conv = svc.conversation(&conv.id).await.unwrap();
        assert_eq!(conv.messages.len(), 3);
        assert_eq!(conv.messages[2].text, FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn test_empty_question_touches_nothing() {
        let svc = service(Arc::new(FailingBackend));
        let conv = svc.start_conversation(Locale::En).await;

        let err = svc.ask(&conv.id, "   ", None).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyQuestion));

        let conv = svc.conversation(&conv.id).await.unwrap();
        assert_eq!(conv.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_locale_toggle_sticks() {
        let svc = service(Arc::new(EchoBackend));
        let conv = svc.start_conversation(Locale::En).await;

        svc.ask(&conv.id, "hello", Some(Locale::Ar)).await.unwrap();
        assert_eq!(svc.conversation(&conv.id).await.unwrap().locale, Locale::Ar);
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let svc = service(Arc::new(EchoBackend));
        assert!(matches!(
            svc.ask("missing", "hi", None).await.unwrap_err(),
            ChatError::UnknownConversation(_)
        ));
    }
}
