//! Workflow item persistence.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{WorkflowItem, WorkflowStatus};

/// Durable store for workflow items.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Insert or update an item by id.
    async fn save(&self, item: &WorkflowItem) -> anyhow::Result<()>;

    /// Fetch one item.
    async fn get(&self, id: &str) -> anyhow::Result<Option<WorkflowItem>>;

    /// List items, optionally restricted to one status, newest first.
    async fn list(&self, status: Option<WorkflowStatus>) -> anyhow::Result<Vec<WorkflowItem>>;
}

/// In-memory workflow repository.
#[derive(Default)]
pub struct MemoryWorkflowRepository {
    items: RwLock<HashMap<String, WorkflowItem>>,
}

impl MemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for MemoryWorkflowRepository {
    async fn save(&self, item: &WorkflowItem) -> anyhow::Result<()> {
        self.items
            .write()
            .await
            .insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<WorkflowItem>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn list(&self, status: Option<WorkflowStatus>) -> anyhow::Result<Vec<WorkflowItem>> {
        let mut items: Vec<WorkflowItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|i| status.map(|s| i.status == s).unwrap_or(true))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}

/// JSON-file-backed workflow repository. Same durability model as
/// `FileDocumentRepository`: full map loaded at open, rewritten per save.
pub struct FileWorkflowRepository {
    path: PathBuf,
    items: RwLock<HashMap<String, WorkflowItem>>,
}

impl FileWorkflowRepository {
    /// Open the repository, loading existing items if the file is present.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let items = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Opened workflow repository at {}", path.display());
        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    async fn persist(&self, items: &HashMap<String, WorkflowItem>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowRepository for FileWorkflowRepository {
    async fn save(&self, item: &WorkflowItem) -> anyhow::Result<()> {
        let mut items = self.items.write().await;
        items.insert(item.id.clone(), item.clone());
        self.persist(&items).await
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<WorkflowItem>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn list(&self, status: Option<WorkflowStatus>) -> anyhow::Result<Vec<WorkflowItem>> {
        let mut items: Vec<WorkflowItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|i| status.map(|s| i.status == s).unwrap_or(true))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_file_repository_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.json");
        let due = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();

        let repo = FileWorkflowRepository::open(&path).await.unwrap();
        let item = WorkflowItem::new("w-1".into(), "NDA review".into(), "sarah".into(), due);
        repo.save(&item).await.unwrap();
        drop(repo);

        let repo = FileWorkflowRepository::open(&path).await.unwrap();
        let stored = repo.get("w-1").await.unwrap().unwrap();
        assert_eq!(stored.title, "NDA review");
        assert_eq!(repo.list(None).await.unwrap().len(), 1);
        assert_eq!(
            repo.list(Some(WorkflowStatus::Approved)).await.unwrap().len(),
            0
        );
    }
}
