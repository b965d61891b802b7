//! End-to-end ingestion scenarios: upload through extraction to the
//! committed library record, with a deterministic extraction backend
//! standing in for the OCR tools.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use lexvault::config::IntakeConfig;
use lexvault::ingest::{
    ExtractionBackend, ExtractionError, ExtractionOutcome, ExtractionWorker, IngestionPipeline,
    UploadRequest, VerificationDecision,
};
use lexvault::models::{AccessLevel, DocumentStatus};
use lexvault::repository::{DocumentRepository, MemoryDocumentRepository};
use lexvault::storage::{BlobStore, MemoryBlobStore};

/// Extraction backend returning a fixed outcome.
struct FixedExtractor {
    outcome: ExtractionOutcome,
}

impl FixedExtractor {
    fn with_confidence(confidence: f32) -> Self {
        let mut fields = HashMap::new();
        fields.insert("category".to_string(), "Contract".to_string());
        Self {
            outcome: ExtractionOutcome {
                text: "This Service Agreement is entered into by the parties.".to_string(),
                fields,
                confidence,
            },
        }
    }
}

#[async_trait]
impl ExtractionBackend for FixedExtractor {
    async fn extract(
        &self,
        _content: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        Ok(self.outcome.clone())
    }
}

/// Extraction backend that always errors, simulating a broken OCR tool.
struct BrokenExtractor;

#[async_trait]
impl ExtractionBackend for BrokenExtractor {
    async fn extract(
        &self,
        _content: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        Err(ExtractionError::ToolNotFound("tesseract".to_string()))
    }
}

struct Harness {
    pipeline: IngestionPipeline,
    repo: Arc<MemoryDocumentRepository>,
    blobs: Arc<MemoryBlobStore>,
}

fn harness() -> Harness {
    let repo = Arc::new(MemoryDocumentRepository::new());
    let pipeline = IngestionPipeline::new(IntakeConfig::default(), repo.clone());
    Harness {
        pipeline,
        repo,
        blobs: Arc::new(MemoryBlobStore::new()),
    }
}

/// Upload a file and run it through to the OCR phase.
async fn upload(h: &Harness, name: &str, mime: &str) -> String {
    let content = b"%PDF-1.4 fake document bytes";
    let id = h
        .pipeline
        .begin_upload(UploadRequest {
            name: name.to_string(),
            mime_type: mime.to_string(),
            size_bytes: content.len() as u64,
            uploaded_by: "sarah".to_string(),
            access_level: AccessLevel::Lawyer,
        })
        .await
        .unwrap();

    let hash = h.blobs.put(content, mime).await.unwrap();
    h.pipeline.record_blob(&id, &hash).await.unwrap();
    h.pipeline.report_progress(&id, 100).await;
    h.pipeline.complete_upload(&id).await.unwrap();
    id
}

#[tokio::test]
async fn confident_extraction_lands_in_the_library() {
    let h = harness();
    let id = upload(&h, "agreement.pdf", "application/pdf").await;

    let worker = ExtractionWorker::new(
        Arc::new(FixedExtractor::with_confidence(0.93)),
        h.blobs.clone(),
    );
    let status = worker.process(&h.pipeline, &id).await.unwrap();
    assert_eq!(status, DocumentStatus::Categorized);

    let stored = h.repo.get(&id).await.unwrap().expect("committed document");
    assert_eq!(stored.status, DocumentStatus::Categorized);
    assert_eq!(stored.category.as_deref(), Some("Contract"));
    assert_eq!(stored.progress, 100);
    let extraction = stored.extraction.expect("extraction attached");
    assert!(extraction.text.contains("Service Agreement"));
    assert!((extraction.confidence - 0.93).abs() < f32::EPSILON);
}

#[tokio::test]
async fn low_confidence_waits_for_verification_then_accept() {
    let h = harness();
    let id = upload(&h, "scan.jpg", "image/jpeg").await;

    let worker = ExtractionWorker::new(
        Arc::new(FixedExtractor::with_confidence(0.55)),
        h.blobs.clone(),
    );
    let status = worker.process(&h.pipeline, &id).await.unwrap();
    assert_eq!(status, DocumentStatus::RequiresVerification);

    // Nothing committed while the document waits for a human.
    assert!(h.repo.get(&id).await.unwrap().is_none());

    let status = h
        .pipeline
        .resolve_verification(&id, VerificationDecision::Accept)
        .await
        .unwrap();
    assert_eq!(status, DocumentStatus::Categorized);

    let stored = h.repo.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Categorized);
}

#[tokio::test]
async fn broken_extraction_routes_to_verification_then_reject() {
    let h = harness();
    let id = upload(&h, "scan.png", "image/png").await;

    let worker = ExtractionWorker::new(Arc::new(BrokenExtractor), h.blobs.clone());
    let status = worker.process(&h.pipeline, &id).await.unwrap();
    assert_eq!(status, DocumentStatus::RequiresVerification);

    let doc = h.pipeline.document(&id).await.unwrap();
    assert_eq!(doc.extraction.unwrap().confidence, 0.0);

    let status = h
        .pipeline
        .resolve_verification(&id, VerificationDecision::Reject)
        .await
        .unwrap();
    assert_eq!(status, DocumentStatus::Rejected);

    let stored = h.repo.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Rejected);

    // The decision is final.
    assert!(h
        .pipeline
        .resolve_verification(&id, VerificationDecision::Accept)
        .await
        .is_err());
}

#[tokio::test]
async fn missing_blob_counts_as_failed_extraction() {
    let h = harness();
    // No blob recorded for this upload.
    let id = h
        .pipeline
        .begin_upload(UploadRequest {
            name: "lost.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 100,
            uploaded_by: "sarah".to_string(),
            access_level: AccessLevel::Paralegal,
        })
        .await
        .unwrap();
    h.pipeline.complete_upload(&id).await.unwrap();

    let worker = ExtractionWorker::new(
        Arc::new(FixedExtractor::with_confidence(0.99)),
        h.blobs.clone(),
    );
    let status = worker.process(&h.pipeline, &id).await.unwrap();
    assert_eq!(status, DocumentStatus::RequiresVerification);
}
