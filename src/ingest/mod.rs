//! Document ingestion: intake validation, the upload/OCR state machine, and
//! the extraction worker that feeds it.

mod error;
mod events;
mod extract;
mod pipeline;

pub use error::IngestError;
pub use events::IngestEvent;
pub use extract::{
    recognize_fields, text_quality, ExtractionBackend, ExtractionError, ExtractionOutcome,
    ExtractionWorker, ToolExtractor,
};
pub use pipeline::{IngestionPipeline, UploadRequest, VerificationDecision};
