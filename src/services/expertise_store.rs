//! Expertise & Learning Context: classifies a task into a domain, injects
//! the matching blob into the agent prompt, and learns from each session's
//! tool log afterward.
//!
//! Treated as peripheral per spec §4.8: the core only depends on
//! `get(domain) -> blob` and `observe(session_id, task, log) -> ()`.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ExpertiseDomain, ExpertiseRecord, Task};
use crate::domain::ports::ExpertiseRepository;

const DOMAIN_KEYWORDS: &[(ExpertiseDomain, &[&str])] = &[
    (ExpertiseDomain::Database, &["schema", "migration", "query", "sql", "table"]),
    (ExpertiseDomain::Api, &["endpoint", "api", "route", "handler", "request"]),
    (ExpertiseDomain::Frontend, &["ui", "component", "frontend", "css", "react"]),
    (ExpertiseDomain::Testing, &["test", "assert", "mock", "coverage"]),
    (ExpertiseDomain::Security, &["auth", "security", "vulnerability", "encrypt", "token"]),
    (ExpertiseDomain::Deployment, &["deploy", "ci", "docker", "pipeline", "release"]),
];

/// Classify a task into one domain by a weighted keyword-plus-file-path
/// match; falls back to `General` when nothing scores.
pub fn classify_domain(task: &Task) -> ExpertiseDomain {
    let text = task.combined_text().to_lowercase();
    let files = task.predicted_files().join(" ").to_lowercase();

    let mut best = ExpertiseDomain::General;
    let mut best_score = 0usize;

    for (domain, keywords) in DOMAIN_KEYWORDS {
        let score = keywords
            .iter()
            .map(|kw| text.matches(kw).count() + files.matches(kw).count())
            .sum::<usize>();
        if score > best_score {
            best_score = score;
            best = *domain;
        }
    }

    best
}

pub struct ExpertiseStore {
    repo: Arc<dyn ExpertiseRepository>,
}

impl ExpertiseStore {
    pub fn new(repo: Arc<dyn ExpertiseRepository>) -> Self {
        Self { repo }
    }

    /// Prompt-ready text blob for a task's classified domain, or an empty
    /// string if nothing has been learned for it yet.
    pub async fn get(&self, project_id: Uuid, task: &Task) -> DomainResult<String> {
        let domain = classify_domain(task);
        let record = self.repo.get(project_id, domain).await?;
        Ok(record.map(|r| r.render()).unwrap_or_default())
    }

    /// Merge a session's observed tool log into the store, pruning to the
    /// per-domain size budget.
    pub async fn observe(
        &self,
        project_id: Uuid,
        task: &Task,
        touched_files: &[String],
        tool_log: &[String],
        success: bool,
    ) -> DomainResult<()> {
        let domain = classify_domain(task);
        let mut record = self
            .repo
            .get(project_id, domain)
            .await?
            .unwrap_or_else(|| ExpertiseRecord::new(project_id, domain));

        for file in touched_files {
            if !record.hot_files.contains(file) {
                record.hot_files.push(file.clone());
            }
        }

        if success {
            if let Some(pattern) = summarize(tool_log) {
                record.patterns.push(pattern);
            }
        } else if let Some(failure) = summarize(tool_log) {
            record.learnings.push(format!("failure: {failure}"));
        }

        record.prune();
        record.bump_version();
        self.repo.upsert(&record).await
    }
}

fn summarize(tool_log: &[String]) -> Option<String> {
    tool_log.last().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_database_keywords() {
        let task = Task::new(Uuid::new_v4(), "add migration", "create schema for users table", 0);
        assert_eq!(classify_domain(&task), ExpertiseDomain::Database);
    }

    #[test]
    fn falls_back_to_general() {
        let task = Task::new(Uuid::new_v4(), "say hello", "print a greeting", 0);
        assert_eq!(classify_domain(&task), ExpertiseDomain::General);
    }
}
