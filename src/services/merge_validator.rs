//! Merge Validator: after a parallel batch finishes, merges every touched
//! worktree into main, test-gates the result, and rolls back on failure.
//! Grounded on `merge_queue.rs`'s conflict-probing and `git merge`/`abort`
//! shape, generalized from its two-stage agent→task→main queue to the
//! single-stage "merge all, then test" protocol this batch model calls for.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Worktree;
use crate::domain::ports::{MergeMode, VcsInvoker, WorktreeRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Success,
    Conflicts,
    TestFailed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct MergeConflict {
    pub epic_id: Uuid,
    pub branch: String,
    pub conflicted_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MergeReport {
    pub status: MergeOutcome,
    pub conflicts: Vec<MergeConflict>,
    pub test_output: Option<String>,
    pub merged_worktrees: Vec<Uuid>,
    pub duration: Duration,
}

pub struct MergeValidatorConfig {
    pub main_branch: String,
    pub test_command: Option<String>,
    pub test_timeout: Duration,
}

impl Default for MergeValidatorConfig {
    fn default() -> Self {
        Self {
            main_branch: "main".to_string(),
            test_command: None,
            test_timeout: Duration::from_secs(300),
        }
    }
}

pub struct MergeValidator {
    vcs: Arc<dyn VcsInvoker>,
    worktree_repo: Arc<dyn WorktreeRepository>,
    repo_root: std::path::PathBuf,
    config: MergeValidatorConfig,
}

impl MergeValidator {
    pub fn new(
        vcs: Arc<dyn VcsInvoker>,
        worktree_repo: Arc<dyn WorktreeRepository>,
        repo_root: std::path::PathBuf,
        config: MergeValidatorConfig,
    ) -> Self {
        Self { vcs, worktree_repo, repo_root, config }
    }

    /// Run the full protocol for a completed parallel batch. Sequential
    /// batches should never reach here: the caller decides that.
    pub async fn validate(&self, epic_ids: &[Uuid], project_id: Uuid) -> DomainResult<MergeReport> {
        let started = Instant::now();

        if epic_ids.is_empty() {
            return Ok(MergeReport {
                status: MergeOutcome::Skipped,
                conflicts: vec![],
                test_output: None,
                merged_worktrees: vec![],
                duration: started.elapsed(),
            });
        }

        let mut worktrees = Vec::with_capacity(epic_ids.len());
        for epic_id in epic_ids {
            if let Some(worktree) = self.worktree_repo.get_by_epic(project_id, *epic_id).await? {
                worktrees.push(worktree);
            }
        }

        let mut conflicts = Vec::new();
        let mut merged_commits = 0u32;
        let mut merged_worktrees = Vec::new();

        for worktree in &worktrees {
            match self.merge_one(worktree).await {
                Ok(true) => {
                    merged_commits += 1;
                    merged_worktrees.push(worktree.id);
                }
                Ok(false) => {
                    let conflicted_files = self.vcs.diff_conflicted_paths(&self.repo_root).await.unwrap_or_default();
                    conflicts.push(MergeConflict {
                        epic_id: worktree.epic_id,
                        branch: worktree.branch.clone(),
                        conflicted_files,
                    });
                }
                Err(err) => {
                    warn!(epic_id = %worktree.epic_id, error = %err, "merge attempt failed");
                    conflicts.push(MergeConflict {
                        epic_id: worktree.epic_id,
                        branch: worktree.branch.clone(),
                        conflicted_files: vec![],
                    });
                }
            }
        }

        if !conflicts.is_empty() {
            let _ = self.vcs.merge_abort(&self.repo_root).await;
            return Ok(MergeReport {
                status: MergeOutcome::Conflicts,
                conflicts,
                test_output: None,
                merged_worktrees,
                duration: started.elapsed(),
            });
        }

        if let Some(command) = &self.config.test_command {
            match self.run_test_command(command).await {
                Ok(output) if output.0 => {
                    info!("test gate passed after merge");
                }
                Ok(output) => {
                    self.vcs.reset_hard(&self.repo_root, merged_commits).await?;
                    return Ok(MergeReport {
                        status: MergeOutcome::TestFailed,
                        conflicts: vec![],
                        test_output: Some(output.1),
                        merged_worktrees: vec![],
                        duration: started.elapsed(),
                    });
                }
                Err(DomainError::TestTimeout(secs)) => {
                    self.vcs.reset_hard(&self.repo_root, merged_commits).await?;
                    return Ok(MergeReport {
                        status: MergeOutcome::TestFailed,
                        conflicts: vec![],
                        test_output: Some(format!("test command timed out after {secs}s")),
                        merged_worktrees: vec![],
                        duration: started.elapsed(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        for worktree in &worktrees {
            let worktree_path = Path::new(&worktree.path);
            let _ = self.vcs.worktree_remove(&self.repo_root, worktree_path, false).await;
        }

        Ok(MergeReport {
            status: MergeOutcome::Success,
            conflicts: vec![],
            test_output: None,
            merged_worktrees,
            duration: started.elapsed(),
        })
    }

    /// Stage a non-commit merge; returns `Ok(true)` on clean merge (already
    /// committed), `Ok(false)` when conflicted paths were reported.
    async fn merge_one(&self, worktree: &Worktree) -> DomainResult<bool> {
        self.vcs.checkout(&self.repo_root, &self.config.main_branch).await?;
        let output = self.vcs.merge(&self.repo_root, &worktree.branch, MergeMode::NoCommit).await?;

        if !output.success() {
            self.vcs.merge_abort(&self.repo_root).await?;
            return Ok(false);
        }

        let conflicted = self.vcs.diff_conflicted_paths(&self.repo_root).await?;
        if !conflicted.is_empty() {
            self.vcs.merge_abort(&self.repo_root).await?;
            return Ok(false);
        }

        self.vcs
            .commit(&self.repo_root, &format!("merge epic {}", worktree.epic_id))
            .await?;
        Ok(true)
    }

    async fn run_test_command(&self, command: &str) -> DomainResult<(bool, String)> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| DomainError::ValidationFailed("empty test command".to_string()))?;
        let args: Vec<&str> = parts.collect();

        let run = async {
            Command::new(program)
                .args(&args)
                .current_dir(&self.repo_root)
                .output()
                .await
                .map_err(DomainError::from)
        };

        match timeout(self.config.test_timeout, run).await {
            Ok(Ok(output)) => {
                let combined = format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
                Ok((output.status.success(), combined))
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DomainError::TestTimeout(self.config.test_timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::WorktreeStatus;
    use crate::domain::ports::VcsOutput;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct ConflictingVcs;

    #[async_trait]
    impl VcsInvoker for ConflictingVcs {
        async fn init(&self, _dir: &Path) -> DomainResult<()> {
            Ok(())
        }
        async fn rev_parse(&self, _dir: &Path, _rev: &str) -> DomainResult<String> {
            Ok(String::new())
        }
        async fn symbolic_ref(&self, _dir: &Path, _name: &str) -> DomainResult<String> {
            Ok(String::new())
        }
        async fn branch(&self, _dir: &Path, _name: &str, _start_point: &str) -> DomainResult<()> {
            Ok(())
        }
        async fn checkout(&self, _dir: &Path, _target: &str) -> DomainResult<()> {
            Ok(())
        }
        async fn worktree_add(&self, _dir: &Path, _path: &Path, _branch: &str) -> DomainResult<()> {
            Ok(())
        }
        async fn worktree_list(&self, _dir: &Path) -> DomainResult<VcsOutput> {
            Ok(VcsOutput { stdout: String::new(), stderr: String::new(), exit_code: 0 })
        }
        async fn worktree_remove(&self, _dir: &Path, _path: &Path, _force: bool) -> DomainResult<()> {
            Ok(())
        }
        async fn merge(&self, _dir: &Path, _branch: &str, _mode: MergeMode) -> DomainResult<VcsOutput> {
            Ok(VcsOutput { stdout: String::new(), stderr: "CONFLICT".to_string(), exit_code: 1 })
        }
        async fn merge_abort(&self, _dir: &Path) -> DomainResult<()> {
            Ok(())
        }
        async fn merge_base(&self, _dir: &Path, _a: &str, _b: &str) -> DomainResult<String> {
            Ok(String::new())
        }
        async fn merge_tree(&self, _dir: &Path, _a: &str, _b: &str) -> DomainResult<VcsOutput> {
            Ok(VcsOutput { stdout: String::new(), stderr: String::new(), exit_code: 0 })
        }
        async fn diff_conflicted_paths(&self, _dir: &Path) -> DomainResult<Vec<String>> {
            Ok(vec!["src/lib.rs".to_string()])
        }
        async fn status_short(&self, _dir: &Path) -> DomainResult<String> {
            Ok(String::new())
        }
        async fn commit(&self, _dir: &Path, _message: &str) -> DomainResult<()> {
            Ok(())
        }
        async fn add_all(&self, _dir: &Path) -> DomainResult<()> {
            Ok(())
        }
        async fn reset_hard(&self, _dir: &Path, _n_commits: u32) -> DomainResult<()> {
            Ok(())
        }
        async fn rev_parse_head(&self, _dir: &Path) -> DomainResult<String> {
            Ok("abc".to_string())
        }
        fn timeout(&self) -> Duration {
            Duration::from_secs(60)
        }
    }

    struct FakeWorktrees(Mutex<HashMap<(Uuid, Uuid), Worktree>>);

    #[async_trait]
    impl WorktreeRepository for FakeWorktrees {
        async fn create(&self, worktree: &Worktree) -> DomainResult<()> {
            self.0.lock().unwrap().insert((worktree.project_id, worktree.epic_id), worktree.clone());
            Ok(())
        }
        async fn get(&self, id: Uuid) -> DomainResult<Option<Worktree>> {
            Ok(self.0.lock().unwrap().values().find(|w| w.id == id).cloned())
        }
        async fn get_by_epic(&self, project_id: Uuid, epic_id: Uuid) -> DomainResult<Option<Worktree>> {
            Ok(self.0.lock().unwrap().get(&(project_id, epic_id)).cloned())
        }
        async fn update(&self, worktree: &Worktree) -> DomainResult<()> {
            self.0.lock().unwrap().insert((worktree.project_id, worktree.epic_id), worktree.clone());
            Ok(())
        }
        async fn delete(&self, id: Uuid) -> DomainResult<()> {
            self.0.lock().unwrap().retain(|_, w| w.id != id);
            Ok(())
        }
        async fn list_by_status(&self, status: WorktreeStatus) -> DomainResult<Vec<Worktree>> {
            Ok(self.0.lock().unwrap().values().filter(|w| w.status == status).cloned().collect())
        }
        async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Worktree>> {
            Ok(self.0.lock().unwrap().values().filter(|w| w.project_id == project_id).cloned().collect())
        }
        async fn list_for_cleanup(&self) -> DomainResult<Vec<Worktree>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn conflicting_merge_reports_conflicts() {
        let project_id = Uuid::new_v4();
        let worktree = Worktree::new(project_id, Uuid::new_v4(), "/tmp/wt", "epic-demo");
        let repo = Arc::new(FakeWorktrees(Mutex::new(HashMap::from([
            ((project_id, worktree.epic_id), worktree.clone()),
        ]))));

        let validator = MergeValidator::new(
            Arc::new(ConflictingVcs),
            repo,
            std::path::PathBuf::from("/tmp/repo"),
            MergeValidatorConfig::default(),
        );

        let report = validator.validate(&[worktree.epic_id], project_id).await.unwrap();
        assert_eq!(report.status, MergeOutcome::Conflicts);
        assert_eq!(report.conflicts.len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_skipped() {
        let repo = Arc::new(FakeWorktrees(Mutex::new(HashMap::new())));
        let validator = MergeValidator::new(
            Arc::new(ConflictingVcs),
            repo,
            std::path::PathBuf::from("/tmp/repo"),
            MergeValidatorConfig::default(),
        );
        let report = validator.validate(&[], Uuid::new_v4()).await.unwrap();
        assert_eq!(report.status, MergeOutcome::Skipped);
    }
}
