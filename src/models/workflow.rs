//! Workflow items pending human sign-off.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Status of a workflow item. Write-once from `Pending` to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Approved,
    Rejected,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A human-review item: a generated draft or a document awaiting sign-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowItem {
    /// Unique identifier.
    pub id: String,
    /// Short title shown in review queues.
    pub title: String,
    /// Who initiated the review.
    pub initiator: String,
    /// Current status.
    pub status: WorkflowStatus,
    /// Advisory due date. Breach is display-only and never enforced.
    pub due_date: NaiveDate,
    /// Rejection reason, if one was given.
    pub reason: Option<String>,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When a terminal decision was recorded.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl WorkflowItem {
    /// Create a new item in `Pending`.
    pub fn new(id: String, title: String, initiator: String, due_date: NaiveDate) -> Self {
        Self {
            id,
            title,
            initiator,
            status: WorkflowStatus::Pending,
            due_date,
            reason: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Whether the item is past its due date and still unresolved.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == WorkflowStatus::Pending && today > self.due_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            WorkflowStatus::Pending,
            WorkflowStatus::Approved,
            WorkflowStatus::Rejected,
        ] {
            assert_eq!(WorkflowStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_overdue_is_advisory_state_only() {
        let due = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        let mut item = WorkflowItem::new("w-1".into(), "NDA".into(), "sarah".into(), due);

        let after = NaiveDate::from_ymd_opt(2023, 11, 16).unwrap();
        assert!(item.is_overdue(after));
        assert!(!item.is_overdue(due));

        // Resolved items are never overdue, regardless of date.
        item.status = WorkflowStatus::Approved;
        assert!(!item.is_overdue(after));
    }
}
