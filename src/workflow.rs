//! Approval workflow tracking.
//!
//! Items enter `Pending` when created (a generated draft, a document needing
//! sign-off) and move exactly once to `Approved` or `Rejected`. Due dates are
//! advisory; nothing here expires or escalates items automatically.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::models::{WorkflowItem, WorkflowStatus};
use crate::repository::WorkflowRepository;

/// Errors from workflow mutations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Approve/reject on an item that already has a terminal decision.
    /// The first decision is preserved.
    #[error("Workflow item {id} already resolved as '{status}'")]
    AlreadyResolved { id: String, status: WorkflowStatus },

    #[error("Unknown workflow item: {0}")]
    UnknownItem(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Tracks human-review items through their single Pending -> terminal step.
pub struct WorkflowTracker {
    repo: Arc<dyn WorkflowRepository>,
    // Serializes decisions so two reviewers cannot both resolve one item.
    decide: Mutex<()>,
}

impl WorkflowTracker {
    pub fn new(repo: Arc<dyn WorkflowRepository>) -> Self {
        Self {
            repo,
            decide: Mutex::new(()),
        }
    }

    /// Create a new pending item.
    pub async fn create(
        &self,
        title: impl Into<String>,
        initiator: impl Into<String>,
        due_date: NaiveDate,
    ) -> Result<WorkflowItem, WorkflowError> {
        let item = WorkflowItem::new(
            Uuid::new_v4().to_string(),
            title.into(),
            initiator.into(),
            due_date,
        );
        self.repo.save(&item).await?;
        info!(item = %item.id, "Created workflow item: {}", item.title);
        Ok(item)
    }

    /// Approve a pending item.
    pub async fn approve(&self, id: &str) -> Result<WorkflowItem, WorkflowError> {
        self.resolve(id, WorkflowStatus::Approved, None).await
    }

    /// Reject a pending item, optionally recording a reason.
    pub async fn reject(
        &self,
        id: &str,
        reason: Option<String>,
    ) -> Result<WorkflowItem, WorkflowError> {
        self.resolve(id, WorkflowStatus::Rejected, reason).await
    }

    /// Fetch one item.
    pub async fn get(&self, id: &str) -> Result<Option<WorkflowItem>, WorkflowError> {
        Ok(self.repo.get(id).await?)
    }

    /// List items, optionally restricted to one status.
    pub async fn list(
        &self,
        status: Option<WorkflowStatus>,
    ) -> Result<Vec<WorkflowItem>, WorkflowError> {
        Ok(self.repo.list(status).await?)
    }

    async fn resolve(
        &self,
        id: &str,
        decision: WorkflowStatus,
        reason: Option<String>,
    ) -> Result<WorkflowItem, WorkflowError> {
        let _guard = self.decide.lock().await;

        let mut item = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::UnknownItem(id.to_string()))?;

        if item.status.is_terminal() {
            return Err(WorkflowError::AlreadyResolved {
                id: item.id,
                status: item.status,
            });
        }

        item.status = decision;
        item.reason = reason;
        item.resolved_at = Some(Utc::now());
        self.repo.save(&item).await?;

        info!(item = %item.id, "Workflow item resolved: {}", decision);
        Ok(item)
    }
}
