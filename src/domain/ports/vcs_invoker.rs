//! Version-control subprocess invocation port.
//!
//! Covers exactly the invocation list required to drive worktree lifecycle
//! and merge validation: every method maps to a single external VCS
//! subprocess call with a bounded timeout in a fixed working directory.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Output of a subprocess invocation that callers need to inspect rather
/// than just succeed/fail on (e.g. `status --short`, `diff --name-only`).
#[derive(Debug, Clone)]
pub struct VcsOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl VcsOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait VcsInvoker: Send + Sync {
    async fn init(&self, dir: &Path) -> DomainResult<()>;
    async fn rev_parse(&self, dir: &Path, rev: &str) -> DomainResult<String>;
    async fn symbolic_ref(&self, dir: &Path, name: &str) -> DomainResult<String>;
    async fn branch(&self, dir: &Path, name: &str, start_point: &str) -> DomainResult<()>;
    async fn checkout(&self, dir: &Path, target: &str) -> DomainResult<()>;
    async fn worktree_add(&self, dir: &Path, path: &Path, branch: &str) -> DomainResult<()>;
    async fn worktree_list(&self, dir: &Path) -> DomainResult<VcsOutput>;
    async fn worktree_remove(&self, dir: &Path, path: &Path, force: bool) -> DomainResult<()>;
    async fn merge(&self, dir: &Path, branch: &str, mode: MergeMode) -> DomainResult<VcsOutput>;
    async fn merge_abort(&self, dir: &Path) -> DomainResult<()>;
    async fn merge_base(&self, dir: &Path, a: &str, b: &str) -> DomainResult<String>;
    async fn merge_tree(&self, dir: &Path, a: &str, b: &str) -> DomainResult<VcsOutput>;
    async fn diff_conflicted_paths(&self, dir: &Path) -> DomainResult<Vec<String>>;
    async fn status_short(&self, dir: &Path) -> DomainResult<String>;
    async fn commit(&self, dir: &Path, message: &str) -> DomainResult<()>;
    async fn add_all(&self, dir: &Path) -> DomainResult<()>;
    async fn reset_hard(&self, dir: &Path, n_commits: u32) -> DomainResult<()>;
    async fn rev_parse_head(&self, dir: &Path) -> DomainResult<String>;

    /// The bounded timeout every invocation above is run under.
    fn timeout(&self) -> Duration;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    NoCommit,
    Squash,
}
