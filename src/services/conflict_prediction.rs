//! Static, text-based file-conflict prediction.
//!
//! Deliberately conservative: the extracted path set is a hint that
//! downgrades parallelism, never a correctness mechanism. Misses real
//! conflicts and occasionally flags prose (a doc mentioning a filename) —
//! both are acceptable given the design intent in spec §9.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::domain::models::{ConflictKind, PredictedConflict, Task};

/// Ecosystem names that read like filenames but are not paths being edited.
const STOP_LIST: &[&str] = &[
    "node.js", "react.js", "vue.js", "next.js", "express.js", "vite.js",
    "webpack.js", "babel.js", "eslint.js",
];

const ROOT_FILE_ALLOWLIST: &[&str] = &[
    "index.js", "index.ts", "index.py", "main.py", "main.rs", "main.go",
    "package.json", "cargo.toml", "pyproject.toml", "readme.md",
];

static BACKTICK_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\s]+\.[a-zA-Z0-9]+)`").unwrap());
static QUOTED_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([\w./-]*/[\w./-]+\.[a-zA-Z0-9]+)["']"#).unwrap());
static PREFIXED_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:src|api|lib|tests?|docs?|config)/[\w./-]+\.[a-zA-Z0-9]+)\b").unwrap());

/// Extract candidate file paths referenced in `text`.
pub fn extract_candidate_paths(text: &str) -> Vec<String> {
    let mut found: HashSet<String> = HashSet::new();

    for re in [&*BACKTICK_PATH, &*QUOTED_PATH, &*PREFIXED_PATH] {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                found.insert(m.as_str().to_string());
            }
        }
    }

    for word in text.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '.' && c != '/');
        let lower = trimmed.to_lowercase();
        if ROOT_FILE_ALLOWLIST.contains(&lower.as_str()) {
            found.insert(trimmed.to_string());
        }
    }

    found
        .into_iter()
        .filter(|p| !STOP_LIST.contains(&p.to_lowercase().as_str()))
        .collect()
}

fn directory_of(path: &str) -> Option<String> {
    path.rsplit_once('/').map(|(dir, _)| dir.to_string())
}

/// Predict conflicts across a task set: any path named by two or more tasks
/// is a `same_file` conflict; any directory named by two or more tasks
/// (that don't already share a `same_file` conflict) is `same_directory`.
pub fn predict_conflicts(tasks: &[Task]) -> Vec<PredictedConflict> {
    let mut by_file: HashMap<String, Vec<Uuid>> = HashMap::new();
    let mut by_dir: HashMap<String, Vec<Uuid>> = HashMap::new();

    for task in tasks {
        for path in task.predicted_files() {
            by_file.entry(path.clone()).or_default().push(task.id);
            if let Some(dir) = directory_of(&path) {
                by_dir.entry(dir).or_default().push(task.id);
            }
        }
    }

    let mut conflicts = Vec::new();
    let mut file_covered_pairs: HashSet<(Uuid, Uuid)> = HashSet::new();

    for (path, mut ids) in by_file {
        ids.sort();
        ids.dedup();
        if ids.len() < 2 {
            continue;
        }
        for i in 0..ids.len() {
            for j in i + 1..ids.len() {
                file_covered_pairs.insert((ids[i], ids[j]));
            }
        }
        conflicts.push(PredictedConflict {
            task_ids: ids,
            predicted_files: vec![path],
            conflict_type: ConflictKind::SameFile,
        });
    }

    for (dir, mut ids) in by_dir {
        ids.sort();
        ids.dedup();
        if ids.len() < 2 {
            continue;
        }
        let all_pairs_covered = (0..ids.len())
            .flat_map(|i| (i + 1..ids.len()).map(move |j| (i, j)))
            .all(|(i, j)| file_covered_pairs.contains(&(ids[i], ids[j])));
        if all_pairs_covered {
            continue;
        }
        conflicts.push(PredictedConflict {
            task_ids: ids,
            predicted_files: vec![dir],
            conflict_type: ConflictKind::SameDirectory,
        });
    }

    conflicts
}
