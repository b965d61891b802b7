//! Repository layer for metadata persistence.
//!
//! Traits define the storage contract. The memory implementations back tests
//! and ephemeral runs; the file implementations give the CLI durability
//! across invocations. A database-backed deployment implements the same
//! traits against its store of choice.

mod document;
mod workflow;

pub use document::{
    DocumentFilter, DocumentRepository, FileDocumentRepository, MemoryDocumentRepository,
};
pub use workflow::{FileWorkflowRepository, MemoryWorkflowRepository, WorkflowRepository};
