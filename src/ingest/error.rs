//! Error types for the ingestion pipeline.

use thiserror::Error;

use crate::models::DocumentStatus;

/// Errors surfaced by ingestion operations.
///
/// None of these are fatal to the process; each is scoped to a single
/// document. Invalid transitions leave the existing state untouched.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Rejected at intake: unsupported type or oversized file. No document
    /// record is created.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation attempted from a state that does not permit it. Usually a
    /// caller bug or a race with a collaborator; the prior state is kept.
    #[error("Invalid transition: {operation} not allowed from '{from}'")]
    InvalidTransition {
        operation: &'static str,
        from: DocumentStatus,
    },

    /// No in-flight document with this handle.
    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    /// The metadata store rejected a commit.
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
