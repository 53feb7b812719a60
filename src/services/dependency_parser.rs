//! Optional dependency inference: when enabled, scans a task's description
//! and action text for phrases like "depends on task 3" or "after completing
//! task 7" and adds a `Soft` edge for each one it finds.
//!
//! Off by default. Inferred edges are always `Soft` — inference can suggest
//! scheduling hints but can never create a `Hard` edge, and therefore can
//! never introduce a cycle the resolver has to reject.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::domain::models::Task;

static DEPENDENCY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"requires?\s+task\s+(\d+)",
        r"depends?\s+on\s+task\s+(\d+)",
        r"after\s+(?:completing\s+)?task\s+(\d+)",
        r"uses?\s+(?:output\s+from\s+)?task\s+(\d+)",
        r"needs?\s+task\s+(\d+)",
        r"building\s+on\s+task\s+(\d+)",
        r"based\s+on\s+task\s+(\d+)",
        r"following\s+task\s+(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern is valid"))
    .collect()
});

/// Tasks are numbered 1-based by their position in `all_tasks` for the
/// purpose of matching "task N" phrases — the engine has no integer task
/// IDs of its own, only UUIDs, so ordinal position stands in for them.
pub fn infer_soft_dependencies(task: &Task, all_tasks: &[Task]) -> Vec<Uuid> {
    let haystack = task.combined_text().to_lowercase();
    let mut ordinals: std::collections::HashSet<usize> = std::collections::HashSet::new();

    for pattern in DEPENDENCY_PATTERNS.iter() {
        for caps in pattern.captures_iter(&haystack) {
            if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) {
                ordinals.insert(n);
            }
        }
    }

    let mut inferred = Vec::new();
    for ordinal in ordinals {
        if ordinal == 0 || ordinal > all_tasks.len() {
            continue;
        }
        let candidate = &all_tasks[ordinal - 1];
        if candidate.id != task.id {
            inferred.push(candidate.id);
        }
    }

    // Also match by description text, for tasks that reference each other
    // by name rather than by ordinal ("Requires: database schema").
    for other in all_tasks {
        if other.id == task.id || other.description.len() <= 10 {
            continue;
        }
        let snippet = other.description.to_lowercase();
        let snippet = &snippet[..snippet.len().min(30)];
        let needle_patterns = ["requires", "require", "need", "needs", "depends on", "after", "uses", "use"];
        if needle_patterns
            .iter()
            .any(|kw| haystack.contains(kw) && haystack.contains(snippet))
            && !inferred.contains(&other.id)
        {
            inferred.push(other.id);
        }
    }

    inferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn infers_ordinal_reference() {
        let epic = Uuid::new_v4();
        let a = Task::new(epic, "set up schema", "create tables", 0);
        let b = Task::new(epic, "build api", "depends on task 1 to expose endpoints", 0);
        let tasks = vec![a.clone(), b.clone()];
        let inferred = infer_soft_dependencies(&b, &tasks);
        assert_eq!(inferred, vec![a.id]);
    }

    #[test]
    fn out_of_range_ordinal_is_ignored() {
        let epic = Uuid::new_v4();
        let a = Task::new(epic, "solo", "depends on task 99", 0);
        let tasks = vec![a.clone()];
        assert!(infer_soft_dependencies(&a, &tasks).is_empty());
    }
}
