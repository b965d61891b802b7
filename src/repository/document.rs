//! Document metadata persistence.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Document, DocumentStatus};

/// Filters for document listings.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Only documents in this status.
    pub status: Option<DocumentStatus>,
    /// Only documents in this category (exact, case-insensitive).
    pub category: Option<String>,
    /// Substring match against name and extracted text.
    pub query: Option<String>,
}

/// Durable store for document records.
///
/// The ingestion pipeline commits documents here when an attempt reaches a
/// terminal state; the API and CLI read from it. SQL-backed implementations
/// are a collaborator concern and slot in behind this trait.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert or update a document by id.
    async fn save(&self, doc: &Document) -> anyhow::Result<()>;

    /// Fetch one document.
    async fn get(&self, id: &str) -> anyhow::Result<Option<Document>>;

    /// List documents matching the filter, newest first.
    async fn list(&self, filter: &DocumentFilter) -> anyhow::Result<Vec<Document>>;

    /// Count documents grouped by status.
    async fn count_by_status(&self) -> anyhow::Result<HashMap<DocumentStatus, u64>>;
}

fn matches(doc: &Document, filter: &DocumentFilter) -> bool {
    if let Some(status) = filter.status {
        if doc.status != status {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        match &doc.category {
            Some(c) if c.eq_ignore_ascii_case(category) => {}
            _ => return false,
        }
    }
    if let Some(query) = &filter.query {
        let q = query.to_lowercase();
        let in_name = doc.name.to_lowercase().contains(&q);
        let in_text = doc
            .extraction
            .as_ref()
            .map(|e| e.text.to_lowercase().contains(&q))
            .unwrap_or(false);
        if !in_name && !in_text {
            return false;
        }
    }
    true
}

/// In-memory document repository.
#[derive(Default)]
pub struct MemoryDocumentRepository {
    docs: RwLock<HashMap<String, Document>>,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn save(&self, doc: &Document) -> anyhow::Result<()> {
        self.docs.write().await.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Document>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &DocumentFilter) -> anyhow::Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .docs
            .read()
            .await
            .values()
            .filter(|d| matches(d, filter))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn count_by_status(&self) -> anyhow::Result<HashMap<DocumentStatus, u64>> {
        let mut counts = HashMap::new();
        for doc in self.docs.read().await.values() {
            *counts.entry(doc.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// JSON-file-backed document repository.
///
/// Loads the full record map at open and rewrites the file on every save, so
/// CLI invocations see documents ingested by earlier runs. Suitable for one
/// writer process; concurrent processes need a SQL-backed implementation of
/// the same trait.
pub struct FileDocumentRepository {
    path: PathBuf,
    docs: RwLock<HashMap<String, Document>>,
}

impl FileDocumentRepository {
    /// Open the repository, loading existing records if the file is present.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let docs = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Opened document repository at {}", path.display());
        Ok(Self {
            path,
            docs: RwLock::new(docs),
        })
    }

    async fn persist(&self, docs: &HashMap<String, Document>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(docs)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for FileDocumentRepository {
    async fn save(&self, doc: &Document) -> anyhow::Result<()> {
        // Hold the write lock across the file rewrite so saves serialize.
        let mut docs = self.docs.write().await;
        docs.insert(doc.id.clone(), doc.clone());
        self.persist(&docs).await
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Document>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &DocumentFilter) -> anyhow::Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .docs
            .read()
            .await
            .values()
            .filter(|d| matches(d, filter))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn count_by_status(&self) -> anyhow::Result<HashMap<DocumentStatus, u64>> {
        let mut counts = HashMap::new();
        for doc in self.docs.read().await.values() {
            *counts.entry(doc.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
