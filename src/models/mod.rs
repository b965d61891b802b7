//! Data models for lexvault.

mod chat;
mod document;
mod template;
mod workflow;

pub use chat::{ChatMessage, ChatRole, Conversation, Locale, WELCOME_MESSAGE};
pub use document::{AccessLevel, Document, DocumentStatus, Extraction};
pub use template::{Template, TemplateType};
pub use workflow::{WorkflowItem, WorkflowStatus};
