//! `git` subprocess implementation of [`VcsInvoker`].
//!
//! Every call shells out to the `git` binary under a bounded timeout, the
//! same technique `merge_queue.rs`'s `git_merge`/`check_merge_conflicts`
//! used, generalized here to the engine's full worktree/merge lifecycle.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::vcs_invoker::{MergeMode, VcsInvoker, VcsOutput};

pub struct GitInvoker {
    timeout: Duration,
}

impl GitInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> DomainResult<VcsOutput> {
        let command_str = format!("git {}", args.join(" "));
        let child = Command::new("git")
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = tokio::time::timeout(self.timeout, child).await.map_err(|_| {
            DomainError::VcsTimeout { command: command_str.clone(), timeout_secs: self.timeout.as_secs() }
        })?;

        let output = output.map_err(|e| DomainError::VcsCommandFailed {
            command: command_str,
            exit_code: None,
            stderr: e.to_string(),
        })?;

        Ok(VcsOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn run_ok(&self, dir: &Path, args: &[&str]) -> DomainResult<VcsOutput> {
        let output = self.run(dir, args).await?;
        if !output.success() {
            return Err(DomainError::VcsCommandFailed {
                command: format!("git {}", args.join(" ")),
                exit_code: Some(output.exit_code),
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl VcsInvoker for GitInvoker {
    async fn init(&self, dir: &Path) -> DomainResult<()> {
        self.run_ok(dir, &["init"]).await.map(|_| ())
    }

    async fn rev_parse(&self, dir: &Path, rev: &str) -> DomainResult<String> {
        let out = self.run_ok(dir, &["rev-parse", rev]).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn symbolic_ref(&self, dir: &Path, name: &str) -> DomainResult<String> {
        let out = self.run_ok(dir, &["symbolic-ref", "--short", name]).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn branch(&self, dir: &Path, name: &str, start_point: &str) -> DomainResult<()> {
        self.run_ok(dir, &["branch", name, start_point]).await.map(|_| ())
    }

    async fn checkout(&self, dir: &Path, target: &str) -> DomainResult<()> {
        self.run_ok(dir, &["checkout", target]).await.map(|_| ())
    }

    async fn worktree_add(&self, dir: &Path, path: &Path, branch: &str) -> DomainResult<()> {
        let path_str = path.to_string_lossy();
        self.run_ok(dir, &["worktree", "add", &path_str, branch]).await.map(|_| ())
    }

    async fn worktree_list(&self, dir: &Path) -> DomainResult<VcsOutput> {
        self.run_ok(dir, &["worktree", "list", "--porcelain"]).await
    }

    async fn worktree_remove(&self, dir: &Path, path: &Path, force: bool) -> DomainResult<()> {
        let path_str = path.to_string_lossy();
        if force {
            self.run_ok(dir, &["worktree", "remove", "--force", &path_str]).await.map(|_| ())
        } else {
            self.run_ok(dir, &["worktree", "remove", &path_str]).await.map(|_| ())
        }
    }

    async fn merge(&self, dir: &Path, branch: &str, mode: MergeMode) -> DomainResult<VcsOutput> {
        match mode {
            MergeMode::NoCommit => self.run(dir, &["merge", "--no-commit", "--no-ff", branch]).await,
            MergeMode::Squash => self.run(dir, &["merge", "--squash", branch]).await,
        }
    }

    async fn merge_abort(&self, dir: &Path) -> DomainResult<()> {
        // Best-effort: a merge with no conflicts leaves nothing to abort.
        let _ = self.run(dir, &["merge", "--abort"]).await;
        Ok(())
    }

    async fn merge_base(&self, dir: &Path, a: &str, b: &str) -> DomainResult<String> {
        let out = self.run_ok(dir, &["merge-base", a, b]).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn merge_tree(&self, dir: &Path, a: &str, b: &str) -> DomainResult<VcsOutput> {
        self.run(dir, &["merge-tree", a, b]).await
    }

    async fn diff_conflicted_paths(&self, dir: &Path) -> DomainResult<Vec<String>> {
        let out = self.run_ok(dir, &["diff", "--name-only", "--diff-filter=U"]).await?;
        Ok(out.stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
    }

    async fn status_short(&self, dir: &Path) -> DomainResult<String> {
        let out = self.run_ok(dir, &["status", "--short"]).await?;
        Ok(out.stdout)
    }

    async fn commit(&self, dir: &Path, message: &str) -> DomainResult<()> {
        self.run_ok(dir, &["commit", "-m", message]).await.map(|_| ())
    }

    async fn add_all(&self, dir: &Path) -> DomainResult<()> {
        self.run_ok(dir, &["add", "-A"]).await.map(|_| ())
    }

    async fn reset_hard(&self, dir: &Path, n_commits: u32) -> DomainResult<()> {
        let target = format!("HEAD~{n_commits}");
        self.run_ok(dir, &["reset", "--hard", &target]).await.map(|_| ())
    }

    async fn rev_parse_head(&self, dir: &Path) -> DomainResult<String> {
        self.rev_parse(dir, "HEAD").await
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
