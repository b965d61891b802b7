//! Conversation and message models for the legal assistant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text shown as the first message of every conversation.
pub const WELCOME_MESSAGE: &str = "Welcome to the Legal Knowledge Assistant. \
I have access to your internal document database. How can I assist you today? \
(Internal Team Use Only)";

/// Languages the assistant responds in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "en" => Some(Self::En),
            "ar" => Some(Self::Ar),
            _ => None,
        }
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An append-only conversation with the assistant.
///
/// Every conversation opens with the assistant welcome message. Messages
/// are never edited or truncated; `ChatService::ask` is the only writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub locale: Locale,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a new conversation seeded with the welcome message.
    pub fn new(locale: Locale) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            locale,
            messages: vec![ChatMessage::new(ChatRole::Assistant, WELCOME_MESSAGE)],
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}
