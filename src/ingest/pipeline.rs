//! The ingestion state machine.
//!
//! Tracks each document through `Uploading -> ProcessingOcr ->
//! {Categorized | RequiresVerification}` and `RequiresVerification ->
//! {Categorized | Rejected}`. Transitions are compare-and-set on the expected
//! current state: an operation attempted from any other state fails with
//! `InvalidTransition` and mutates nothing.
//!
//! Progress can be reported by any source (the HTTP intake endpoints, a real
//! OCR worker, a test driver); the pipeline only guarantees the observed
//! sequence is monotonic. Each document is guarded by its own lock, so
//! concurrent progress reports and transitions for one document serialize
//! while different documents proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::models::{AccessLevel, Document, DocumentStatus, Extraction};
use crate::repository::DocumentRepository;

use super::error::IngestError;
use super::events::IngestEvent;
use super::extract::ExtractionOutcome;

/// Buffered events per subscriber before lagging receivers drop messages.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// File metadata presented at the start of an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_by: String,
    pub access_level: AccessLevel,
}

/// Human decision on a document flagged for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationDecision {
    Accept,
    Reject,
}

/// The ingestion pipeline.
///
/// Holds transient in-flight state for documents; once an ingestion attempt
/// reaches a terminal status (`Categorized` or `Rejected`) the document is
/// committed to the repository. Terminal records stay in the in-flight map
/// until evicted so that late operations fail loudly instead of resurrecting
/// the document.
pub struct IngestionPipeline {
    intake: IntakeConfig,
    repo: Arc<dyn DocumentRepository>,
    records: RwLock<HashMap<String, Arc<Mutex<Document>>>>,
    events: broadcast::Sender<IngestEvent>,
}

impl IngestionPipeline {
    pub fn new(intake: IntakeConfig, repo: Arc<dyn DocumentRepository>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            intake,
            repo,
            records: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.events.subscribe()
    }

    pub fn intake_config(&self) -> &IntakeConfig {
        &self.intake
    }

    /// Accept a file for ingestion.
    ///
    /// Validates the extension allow-list and size ceiling; on violation no
    /// document record is created. On success the document starts in
    /// `Uploading` with progress 0 and a `DocumentCreated` event is emitted.
    pub async fn begin_upload(&self, request: UploadRequest) -> Result<String, IngestError> {
        let extension = file_extension(&request.name, &request.mime_type).ok_or_else(|| {
            IngestError::Validation(format!(
                "cannot determine file type of '{}' ({})",
                request.name, request.mime_type
            ))
        })?;

        if !self.intake.allows_extension(&extension) {
            return Err(IngestError::Validation(format!(
                "file type '{}' is not accepted (allowed: {})",
                extension,
                self.intake.allowed_types.join(", ")
            )));
        }

        if request.size_bytes > self.intake.max_bytes {
            return Err(IngestError::Validation(format!(
                "file size {} exceeds the {} byte limit",
                request.size_bytes, self.intake.max_bytes
            )));
        }

        let doc = Document::new(
            Uuid::new_v4().to_string(),
            request.name,
            request.mime_type,
            request.size_bytes,
            request.uploaded_by,
            request.access_level,
        );
        let id = doc.id.clone();
        let created_at = doc.created_at;
        let name = doc.name.clone();

        self.records
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(doc)));

        info!(document = %id, "Accepted upload: {}", name);
        let _ = self.events.send(IngestEvent::DocumentCreated {
            id: id.clone(),
            name,
            at: created_at,
        });

        Ok(id)
    }

    /// Advance upload/OCR progress by `delta` percentage points.
    ///
    /// Progress is monotonic and clamped to 100. Reports for unknown
    /// documents or documents outside the upload/OCR phases are dropped
    /// without error, since progress reporting can race with completion.
    pub async fn report_progress(&self, id: &str, delta: u8) {
        let Some(record) = self.record(id).await else {
            return;
        };
        let mut doc = record.lock().await;
        if !doc.status.accepts_progress() {
            return;
        }

        let next = doc.progress.saturating_add(delta).min(100);
        if next == doc.progress {
            return;
        }
        doc.progress = next;
        doc.updated_at = Utc::now();

        let _ = self.events.send(IngestEvent::ProgressUpdated {
            id: id.to_string(),
            status: doc.status,
            progress: doc.progress,
        });
    }

    /// Mark the upload phase finished: `Uploading -> ProcessingOcr`.
    ///
    /// Progress resets to 0 for the OCR phase.
    pub async fn complete_upload(&self, id: &str) -> Result<(), IngestError> {
        let record = self.require_record(id).await?;
        let mut doc = record.lock().await;
        if doc.status != DocumentStatus::Uploading {
            return Err(IngestError::InvalidTransition {
                operation: "complete_upload",
                from: doc.status,
            });
        }

        doc.progress = 0;
        self.transition(&mut doc, DocumentStatus::ProcessingOcr).await
    }

    /// Record the extraction outcome: `ProcessingOcr -> Categorized` when
    /// confidence meets the configured threshold (boundary inclusive),
    /// otherwise `-> RequiresVerification`.
    pub async fn complete_extraction(
        &self,
        id: &str,
        outcome: ExtractionOutcome,
    ) -> Result<DocumentStatus, IngestError> {
        let record = self.require_record(id).await?;
        let mut doc = record.lock().await;
        if doc.status != DocumentStatus::ProcessingOcr {
            return Err(IngestError::InvalidTransition {
                operation: "complete_extraction",
                from: doc.status,
            });
        }

        let confidence = outcome.confidence.clamp(0.0, 1.0);
        let to = if confidence >= self.intake.confidence_threshold {
            DocumentStatus::Categorized
        } else {
            DocumentStatus::RequiresVerification
        };

        if doc.category.is_none() {
            doc.category = outcome.fields.get("category").cloned();
        }
        doc.extraction = Some(Extraction {
            text: outcome.text,
            fields: outcome.fields,
            confidence,
            extracted_at: Utc::now(),
        });
        doc.progress = 100;

        debug!(
            document = %id,
            confidence,
            threshold = self.intake.confidence_threshold,
            "Extraction complete, routing to {}",
            to
        );
        self.transition(&mut doc, to).await?;
        Ok(to)
    }

    /// Apply a human verification decision:
    /// `RequiresVerification -> {Categorized | Rejected}`.
    pub async fn resolve_verification(
        &self,
        id: &str,
        decision: VerificationDecision,
    ) -> Result<DocumentStatus, IngestError> {
        let record = self.require_record(id).await?;
        let mut doc = record.lock().await;
        if doc.status != DocumentStatus::RequiresVerification {
            return Err(IngestError::InvalidTransition {
                operation: "resolve_verification",
                from: doc.status,
            });
        }

        let to = match decision {
            VerificationDecision::Accept => DocumentStatus::Categorized,
            VerificationDecision::Reject => DocumentStatus::Rejected,
        };
        self.transition(&mut doc, to).await?;
        Ok(to)
    }

    /// Attach the stored blob's content hash to an in-flight document.
    pub async fn record_blob(&self, id: &str, content_hash: &str) -> Result<(), IngestError> {
        let record = self.require_record(id).await?;
        let mut doc = record.lock().await;
        doc.content_hash = Some(content_hash.to_string());
        doc.updated_at = Utc::now();
        Ok(())
    }

    /// Snapshot of one in-flight document.
    pub async fn document(&self, id: &str) -> Option<Document> {
        let record = self.record(id).await?;
        let doc = record.lock().await;
        Some(doc.clone())
    }

    /// Snapshot of all documents still in the in-flight map, including
    /// terminal records that have not been evicted yet.
    pub async fn in_flight(&self) -> Vec<Document> {
        let records: Vec<_> = self.records.read().await.values().cloned().collect();
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            docs.push(record.lock().await.clone());
        }
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }

    /// Drop a terminal record from the in-flight map.
    ///
    /// Returns false (and keeps the record) while the ingestion attempt is
    /// still live; the committed copy lives in the repository either way.
    pub async fn evict(&self, id: &str) -> bool {
        let mut records = self.records.write().await;
        let terminal = match records.get(id) {
            Some(record) => record.lock().await.status.is_ingestion_terminal(),
            None => return false,
        };
        if terminal {
            records.remove(id);
        }
        terminal
    }

    /// Commit a transition: update the record, persist terminal states, and
    /// emit `StatusChanged`. The caller holds the per-document lock and has
    /// already verified the source state.
    async fn transition(
        &self,
        doc: &mut Document,
        to: DocumentStatus,
    ) -> Result<(), IngestError> {
        let from = doc.status;
        doc.status = to;
        doc.updated_at = Utc::now();

        if to.is_ingestion_terminal() {
            if let Err(e) = self.repo.save(doc).await {
                // Roll back so the caller can retry the transition.
                doc.status = from;
                warn!(document = %doc.id, "Failed to commit document: {}", e);
                return Err(IngestError::Storage(e));
            }
        }

        info!(document = %doc.id, "Status {} -> {}", from, to);
        let _ = self.events.send(IngestEvent::StatusChanged {
            id: doc.id.clone(),
            from,
            to,
            at: doc.updated_at,
        });
        Ok(())
    }

    async fn record(&self, id: &str) -> Option<Arc<Mutex<Document>>> {
        self.records.read().await.get(id).cloned()
    }

    async fn require_record(&self, id: &str) -> Result<Arc<Mutex<Document>>, IngestError> {
        self.record(id)
            .await
            .ok_or_else(|| IngestError::UnknownDocument(id.to_string()))
    }
}

/// Determine the file extension for allow-list checks.
///
/// Prefers the filename's extension; falls back to the declared MIME type
/// for names without one.
fn file_extension(name: &str, mime_type: &str) -> Option<String> {
    if let Some(ext) = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
    {
        return Some(ext.to_ascii_lowercase());
    }
    mime_guess::get_mime_extensions_str(mime_type)
        .and_then(|exts| exts.first())
        .map(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryDocumentRepository;
    use std::collections::HashMap as Map;

    fn pipeline() -> IngestionPipeline {
        IngestionPipeline::new(
            IntakeConfig::default(),
            Arc::new(MemoryDocumentRepository::new()),
        )
    }

    fn pdf_request() -> UploadRequest {
        UploadRequest {
            name: "a.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 2_400_000,
            uploaded_by: "sarah".into(),
            access_level: AccessLevel::Lawyer,
        }
    }

    fn outcome(confidence: f32) -> ExtractionOutcome {
        ExtractionOutcome {
            text: "extracted text".into(),
            fields: Map::new(),
            confidence,
        }
    }

    #[tokio::test]
    async fn test_rejects_unsupported_type() {
        let p = pipeline();
        let err = p
            .begin_upload(UploadRequest {
                name: "malware.exe".into(),
                mime_type: "application/octet-stream".into(),
                ..pdf_request()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        assert!(p.in_flight().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_oversized_file() {
        let p = pipeline();
        let err = p
            .begin_upload(UploadRequest {
                size_bytes: 51 * 1024 * 1024,
                ..pdf_request()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        assert!(p.in_flight().await.is_empty());
    }

    #[tokio::test]
    async fn test_extension_fallback_to_mime() {
        let p = pipeline();
        let id = p
            .begin_upload(UploadRequest {
                name: "scanned-notes".into(),
                mime_type: "image/png".into(),
                ..pdf_request()
            })
            .await
            .unwrap();
        assert!(p.document(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_clamped() {
        let p = pipeline();
        let id = p.begin_upload(pdf_request()).await.unwrap();

        p.report_progress(&id, 50).await;
        assert_eq!(p.document(&id).await.unwrap().progress, 50);

        p.report_progress(&id, 60).await;
        assert_eq!(p.document(&id).await.unwrap().progress, 100);

        // No way to move backwards.
        p.report_progress(&id, 0).await;
        assert_eq!(p.document(&id).await.unwrap().progress, 100);
    }

    #[tokio::test]
    async fn test_progress_after_completion_is_dropped() {
        let p = pipeline();
        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.complete_upload(&id).await.unwrap();
        p.complete_extraction(&id, outcome(0.92)).await.unwrap();

        p.report_progress(&id, 10).await;
        let doc = p.document(&id).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Categorized);
        assert_eq!(doc.progress, 100);
    }

    #[tokio::test]
    async fn test_complete_upload_resets_progress_for_ocr() {
        let p = pipeline();
        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.report_progress(&id, 100).await;
        p.complete_upload(&id).await.unwrap();

        let doc = p.document(&id).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::ProcessingOcr);
        assert_eq!(doc.progress, 0);
    }

    #[tokio::test]
    async fn test_complete_upload_twice_fails() {
        let p = pipeline();
        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.complete_upload(&id).await.unwrap();

        let err = p.complete_upload(&id).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::InvalidTransition {
                from: DocumentStatus::ProcessingOcr,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_confidence_threshold_is_inclusive() {
        let p = pipeline();

        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.complete_upload(&id).await.unwrap();
        let status = p.complete_extraction(&id, outcome(0.85)).await.unwrap();
        assert_eq!(status, DocumentStatus::Categorized);

        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.complete_upload(&id).await.unwrap();
        let status = p.complete_extraction(&id, outcome(0.8499)).await.unwrap();
        assert_eq!(status, DocumentStatus::RequiresVerification);
    }

    #[tokio::test]
    async fn test_resolve_verification_reject_then_accept_fails() {
        let p = pipeline();
        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.complete_upload(&id).await.unwrap();
        p.complete_extraction(&id, outcome(0.40)).await.unwrap();

        let status = p
            .resolve_verification(&id, VerificationDecision::Reject)
            .await
            .unwrap();
        assert_eq!(status, DocumentStatus::Rejected);

        let err = p
            .resolve_verification(&id, VerificationDecision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidTransition { .. }));
        // First decision is preserved.
        assert_eq!(
            p.document(&id).await.unwrap().status,
            DocumentStatus::Rejected
        );
    }

    #[tokio::test]
    async fn test_terminal_state_commits_to_repository() {
        let repo = Arc::new(MemoryDocumentRepository::new());
        let p = IngestionPipeline::new(IntakeConfig::default(), repo.clone());

        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.complete_upload(&id).await.unwrap();
        p.complete_extraction(&id, outcome(0.95)).await.unwrap();

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Categorized);
        assert!(stored.extraction.is_some());
    }

    #[tokio::test]
    async fn test_events_describe_the_lifecycle() {
        let p = pipeline();
        let mut rx = p.subscribe();

        let id = p.begin_upload(pdf_request()).await.unwrap();
        p.report_progress(&id, 30).await;
        p.complete_upload(&id).await.unwrap();
        p.complete_extraction(&id, outcome(0.9)).await.unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            IngestEvent::DocumentCreated { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            IngestEvent::ProgressUpdated { progress: 30, .. }
        ));
        match rx.recv().await.unwrap() {
            IngestEvent::StatusChanged { from, to, .. } => {
                assert_eq!(from, DocumentStatus::Uploading);
                assert_eq!(to, DocumentStatus::ProcessingOcr);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            IngestEvent::StatusChanged { from, to, .. } => {
                assert_eq!(from, DocumentStatus::ProcessingOcr);
                assert_eq!(to, DocumentStatus::Categorized);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_progress_reports_stay_monotonic() {
        let p = Arc::new(pipeline());
        let id = p.begin_upload(pdf_request()).await.unwrap();
        let mut rx = p.subscribe();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let p = p.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                p.report_progress(&id, 7).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(p.document(&id).await.unwrap().progress, 100);

        // Every observed progress value is strictly increasing.
        let mut last = 0u8;
        while let Ok(event) = rx.try_recv() {
            if let IngestEvent::ProgressUpdated { progress, .. } = event {
                assert!(progress > last, "{} not > {}", progress, last);
                last = progress;
            }
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn test_evict_only_removes_terminal_records() {
        let p = pipeline();
        let id = p.begin_upload(pdf_request()).await.unwrap();
        assert!(!p.evict(&id).await);
        assert!(p.document(&id).await.is_some());

        p.complete_upload(&id).await.unwrap();
        p.complete_extraction(&id, outcome(0.95)).await.unwrap();
        assert!(p.evict(&id).await);
        assert!(p.document(&id).await.is_none());
    }
}
