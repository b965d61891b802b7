//! Events emitted by the ingestion pipeline.

use chrono::{DateTime, Utc};

use crate::models::DocumentStatus;

/// Events observers receive over the pipeline's broadcast channel.
///
/// Consumers (CLI progress bars, the web API, downstream indexers) react to
/// these instead of polling document state.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    /// A document was accepted for ingestion.
    DocumentCreated {
        id: String,
        name: String,
        at: DateTime<Utc>,
    },
    /// Upload or OCR progress moved forward.
    ProgressUpdated {
        id: String,
        status: DocumentStatus,
        progress: u8,
    },
    /// A status transition committed.
    StatusChanged {
        id: String,
        from: DocumentStatus,
        to: DocumentStatus,
        at: DateTime<Utc>,
    },
}
