//! Worktree Manager: owns the lifecycle of one isolated working copy per
//! epic, under `.worktrees/epic-<id>`. Every operation is idempotent and
//! safe to retry; every state transition is mirrored into the persisted
//! [`Worktree`] row.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Worktree, WorktreeStatus};
use crate::domain::ports::{MergeMode, VcsInvoker, WorktreeRepository};

/// Lowercase; spaces/underscores to hyphens; strip chars outside
/// `[a-z0-9-.]`; collapse repeated hyphens; trim separators; cap at 100;
/// rewrite reserved device names; default to `epic` when empty.
pub fn sanitize_branch_name(epic_name: &str) -> String {
    const RESERVED: &[&str] = &["con", "prn", "aux", "nul"];

    let lower = epic_name.to_lowercase();
    let replaced: String = lower
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.')
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    let mut last_was_hyphen = false;
    for c in replaced.chars() {
        if c == '-' {
            if !last_was_hyphen {
                collapsed.push(c);
            }
            last_was_hyphen = true;
        } else {
            collapsed.push(c);
            last_was_hyphen = false;
        }
    }

    let trimmed = collapsed.trim_matches('-').trim_matches('.');
    let truncated: String = trimmed.chars().take(100).collect();

    let mut name = if truncated.is_empty() { "epic".to_string() } else { truncated };
    if RESERVED.contains(&name.as_str()) {
        name = format!("epic-{name}");
    }
    name
}

pub struct WorktreeManager {
    repo: Arc<dyn WorktreeRepository>,
    vcs: Arc<dyn VcsInvoker>,
    repo_root: PathBuf,
    epic_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl WorktreeManager {
    pub fn new(repo: Arc<dyn WorktreeRepository>, vcs: Arc<dyn VcsInvoker>, repo_root: PathBuf) -> Self {
        Self { repo, vcs, repo_root, epic_locks: Mutex::new(HashMap::new()) }
    }

    async fn lock_for(&self, epic_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.epic_locks.lock().await;
        locks.entry(epic_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn worktree_path(&self, epic_id: Uuid) -> PathBuf {
        self.repo_root.join(".worktrees").join(format!("epic-{epic_id}"))
    }

    async fn detect_main_branch(&self) -> DomainResult<String> {
        match self.vcs.symbolic_ref(&self.repo_root, "refs/remotes/origin/HEAD").await {
            Ok(r) => Ok(r.rsplit('/').next().unwrap_or("main").to_string()),
            Err(_) => {
                for candidate in ["main", "master"] {
                    if self.vcs.rev_parse(&self.repo_root, candidate).await.is_ok() {
                        return Ok(candidate.to_string());
                    }
                }
                Ok("main".to_string())
            }
        }
    }

    /// Return the epic's existing active worktree, or create a fresh one.
    pub async fn create(&self, project_id: Uuid, epic_id: Uuid, epic_name: &str) -> DomainResult<Worktree> {
        let lock = self.lock_for(epic_id).await;
        let _guard = lock.lock().await;

        if let Some(existing) = self.repo.get_by_epic(project_id, epic_id).await? {
            if existing.status == WorktreeStatus::Active && Path::new(&existing.path).is_dir() {
                return Ok(existing);
            }
        }

        let branch = sanitize_branch_name(epic_name);
        let main_branch = self.detect_main_branch().await?;
        let path = self.worktree_path(epic_id);

        if path.exists() {
            warn!(epic_id = %epic_id, ?path, "removing stale worktree directory before create");
            let _ = self.vcs.worktree_remove(&self.repo_root, &path, true).await;
        }

        self.vcs.branch(&self.repo_root, &branch, &main_branch).await?;
        self.vcs.worktree_add(&self.repo_root, &path, &branch).await?;

        let worktree = Worktree::new(project_id, epic_id, path.to_string_lossy().into_owned(), branch);
        self.repo.create(&worktree).await?;
        info!(epic_id = %epic_id, branch = %worktree.branch, "worktree created");
        Ok(worktree)
    }

    /// Merge an epic's worktree branch into the main branch.
    pub async fn merge(&self, project_id: Uuid, epic_id: Uuid, squash: bool) -> DomainResult<Worktree> {
        let lock = self.lock_for(epic_id).await;
        let _guard = lock.lock().await;

        let mut worktree = self
            .repo
            .get_by_epic(project_id, epic_id)
            .await?
            .ok_or(DomainError::WorktreeNotFound(epic_id))?;

        let worktree_path = Path::new(&worktree.path);
        let status = self.vcs.status_short(worktree_path).await?;
        if !status.trim().is_empty() {
            self.vcs.add_all(worktree_path).await?;
            self.vcs.commit(worktree_path, "checkpoint before merge").await?;
        }

        let main_branch = self.detect_main_branch().await?;
        if self.vcs.checkout(&self.repo_root, &main_branch).await.is_err() {
            warn!(epic_id = %epic_id, "checkout of main branch failed, merging against current head");
        }

        let mode = if squash { MergeMode::Squash } else { MergeMode::NoCommit };
        let merge_result = self.vcs.merge(&self.repo_root, &worktree.branch, mode).await;

        match merge_result {
            Ok(output) if output.success() => {
                self.vcs.commit(&self.repo_root, &format!("merge epic {epic_id}")).await?;
                let commit = self.vcs.rev_parse_head(&self.repo_root).await?;
                worktree.mark_merged(commit);
                self.repo.update(&worktree).await?;
                Ok(worktree)
            }
            _ => {
                self.vcs.merge_abort(&self.repo_root).await?;
                worktree.mark_conflict();
                self.repo.update(&worktree).await?;
                Err(DomainError::VcsConflict {
                    branch: worktree.branch.clone(),
                    conflicted_files: self.vcs.diff_conflicted_paths(&self.repo_root).await.unwrap_or_default(),
                })
            }
        }
    }

    /// Remove the worktree directory; delete its branch only if fully merged.
    pub async fn cleanup(&self, project_id: Uuid, epic_id: Uuid) -> DomainResult<()> {
        let lock = self.lock_for(epic_id).await;
        let _guard = lock.lock().await;

        let mut worktree = self
            .repo
            .get_by_epic(project_id, epic_id)
            .await?
            .ok_or(DomainError::WorktreeNotFound(epic_id))?;

        if !worktree.can_cleanup() {
            return Err(DomainError::InvalidStateTransition {
                from: worktree.status.as_str().to_string(),
                to: "cleanup".to_string(),
            });
        }

        let worktree_path = Path::new(&worktree.path);
        if self.vcs.worktree_remove(&self.repo_root, worktree_path, false).await.is_err() {
            warn!(epic_id = %epic_id, "vcs worktree removal failed, forcing directory removal");
            let _ = std::fs::remove_dir_all(worktree_path);
        }

        worktree.mark_cleanup();
        self.repo.update(&worktree).await?;
        Ok(())
    }

    /// Reconcile VCS, filesystem and DB worktree state on startup; flag and
    /// clean up any worktree found in only one of the three sources.
    pub async fn recover_state(&self, project_id: Uuid) -> DomainResult<Vec<Worktree>> {
        let db_worktrees = self.repo.list_for_project(project_id).await?;
        let vcs_listing = self.vcs.worktree_list(&self.repo_root).await?;

        let mut reconciled = Vec::new();
        for mut worktree in db_worktrees {
            let still_on_disk = Path::new(&worktree.path).is_dir();
            let still_in_vcs = vcs_listing.stdout.contains(worktree.path.as_str());

            if worktree.status == WorktreeStatus::Active && (!still_on_disk || !still_in_vcs) {
                warn!(epic_id = %worktree.epic_id, "orphaned active worktree, marking abandoned");
                worktree.mark_abandoned();
                self.repo.update(&worktree).await?;
            }
            reconciled.push(worktree);
        }
        Ok(reconciled)
    }

    pub fn path_for(&self, epic_id: Uuid) -> PathBuf {
        self.worktree_path(epic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_spaces_and_underscores_to_hyphens() {
        assert_eq!(sanitize_branch_name("My Epic_Name"), "my-epic-name");
    }

    #[test]
    fn collapses_repeated_hyphens_and_trims() {
        assert_eq!(sanitize_branch_name("  --weird__epic--  "), "weird-epic");
    }

    #[test]
    fn empty_name_defaults_to_epic() {
        assert_eq!(sanitize_branch_name("!!!"), "epic");
    }

    #[test]
    fn reserved_device_name_is_prefixed() {
        assert_eq!(sanitize_branch_name("con"), "epic-con");
    }

    #[test]
    fn caps_length_at_100() {
        let long = "a".repeat(150);
        assert_eq!(sanitize_branch_name(&long).len(), 100);
    }
}
