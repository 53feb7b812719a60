//! Expertise record model: per-(project, domain) learned context injected
//! into agent prompts by the Parallel Executor (spec §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed seven-element domain set classified tasks fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertiseDomain {
    Database,
    Api,
    Frontend,
    Testing,
    Security,
    Deployment,
    General,
}

impl ExpertiseDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Api => "api",
            Self::Frontend => "frontend",
            Self::Testing => "testing",
            Self::Security => "security",
            Self::Deployment => "deployment",
            Self::General => "general",
        }
    }

    pub fn all() -> [ExpertiseDomain; 7] {
        [
            Self::Database,
            Self::Api,
            Self::Frontend,
            Self::Testing,
            Self::Security,
            Self::Deployment,
            Self::General,
        ]
    }
}

/// Pruning caps applied by the expertise store (spec §4.8).
pub const MAX_LINES_PER_DOMAIN: usize = 1000;
pub const MAX_PATTERNS: usize = 20;
pub const MAX_TECHNIQUES: usize = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertiseRecord {
    pub project_id: Uuid,
    pub domain: ExpertiseDomain,
    pub version: i64,
    pub patterns: Vec<String>,
    pub techniques: Vec<String>,
    pub hot_files: Vec<String>,
    pub learnings: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ExpertiseRecord {
    pub fn new(project_id: Uuid, domain: ExpertiseDomain) -> Self {
        Self {
            project_id,
            domain,
            version: 0,
            patterns: Vec::new(),
            techniques: Vec::new(),
            hot_files: Vec::new(),
            learnings: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Render this record as a prompt-ready text blob.
    pub fn render(&self) -> String {
        let mut blob = format!("# Expertise: {}\n", self.domain.as_str());
        if !self.patterns.is_empty() {
            blob.push_str("## Patterns\n");
            for p in &self.patterns {
                blob.push_str("- ");
                blob.push_str(p);
                blob.push('\n');
            }
        }
        if !self.techniques.is_empty() {
            blob.push_str("## Techniques\n");
            for t in &self.techniques {
                blob.push_str("- ");
                blob.push_str(t);
                blob.push('\n');
            }
        }
        if !self.learnings.is_empty() {
            blob.push_str("## Learnings\n");
            for l in &self.learnings {
                blob.push_str("- ");
                blob.push_str(l);
                blob.push('\n');
            }
        }
        blob
    }

    /// Apply the size-bounded pruning policy: trim oldest failure
    /// learnings first to respect the per-domain line budget, then cap
    /// patterns/techniques to their fixed limits.
    pub fn prune(&mut self) {
        while self.render().lines().count() > MAX_LINES_PER_DOMAIN && !self.learnings.is_empty() {
            self.learnings.remove(0);
        }
        if self.patterns.len() > MAX_PATTERNS {
            let excess = self.patterns.len() - MAX_PATTERNS;
            self.patterns.drain(0..excess);
        }
        if self.techniques.len() > MAX_TECHNIQUES {
            let excess = self.techniques.len() - MAX_TECHNIQUES;
            self.techniques.drain(0..excess);
        }
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_caps_patterns_and_techniques() {
        let mut record = ExpertiseRecord::new(Uuid::new_v4(), ExpertiseDomain::Api);
        record.patterns = (0..30).map(|i| format!("pattern-{i}")).collect();
        record.techniques = (0..20).map(|i| format!("technique-{i}")).collect();
        record.prune();
        assert_eq!(record.patterns.len(), MAX_PATTERNS);
        assert_eq!(record.techniques.len(), MAX_TECHNIQUES);
        assert_eq!(record.patterns[0], "pattern-10");
    }
}
