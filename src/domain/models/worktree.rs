//! Worktree domain model.
//!
//! A worktree is an isolated working copy on a dedicated branch, owned by
//! one epic and keyed uniquely by `(project_id, epic_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed status set, per spec: worktree status is a fixed five-element
/// variant set, never an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorktreeStatus {
    Active,
    Merged,
    Conflict,
    Cleanup,
    Abandoned,
}

impl WorktreeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Merged => "merged",
            Self::Conflict => "conflict",
            Self::Cleanup => "cleanup",
            Self::Abandoned => "abandoned",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "merged" => Some(Self::Merged),
            "conflict" => Some(Self::Conflict),
            "cleanup" => Some(Self::Cleanup),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }

    /// Worktrees in these states are eligible for `cleanup()`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Merged | Self::Cleanup | Self::Abandoned)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worktree {
    pub id: Uuid,
    pub project_id: Uuid,
    pub epic_id: Uuid,
    pub path: String,
    pub branch: String,
    pub status: WorktreeStatus,
    pub created_at: DateTime<Utc>,
    pub merge_commit: Option<String>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl Worktree {
    pub fn new(project_id: Uuid, epic_id: Uuid, path: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            epic_id,
            path: path.into(),
            branch: branch.into(),
            status: WorktreeStatus::Active,
            created_at: Utc::now(),
            merge_commit: None,
            merged_at: None,
        }
    }

    pub fn mark_merged(&mut self, commit: impl Into<String>) {
        self.status = WorktreeStatus::Merged;
        self.merge_commit = Some(commit.into());
        self.merged_at = Some(Utc::now());
    }

    pub fn mark_conflict(&mut self) {
        self.status = WorktreeStatus::Conflict;
    }

    pub fn mark_cleanup(&mut self) {
        self.status = WorktreeStatus::Cleanup;
    }

    pub fn mark_abandoned(&mut self) {
        self.status = WorktreeStatus::Abandoned;
    }

    pub fn can_cleanup(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_worktree_starts_active() {
        let wt = Worktree::new(Uuid::new_v4(), Uuid::new_v4(), "/tmp/wt", "epic-1-demo");
        assert_eq!(wt.status, WorktreeStatus::Active);
        assert!(!wt.can_cleanup());
    }

    #[test]
    fn merged_worktree_is_cleanup_eligible() {
        let mut wt = Worktree::new(Uuid::new_v4(), Uuid::new_v4(), "/tmp/wt", "epic-1-demo");
        wt.mark_merged("abc123");
        assert!(wt.can_cleanup());
        assert_eq!(wt.merge_commit.as_deref(), Some("abc123"));
    }
}
