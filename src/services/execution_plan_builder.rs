//! Execution Plan Builder: turns a project's pending tasks into an
//! [`ExecutionPlan`] — dependency-ordered batches, worktree pre-assignment
//! and predicted file conflicts.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Batch, Epic, ExecutionPlan, Task};

use super::conflict_prediction::predict_conflicts;
use super::dependency_resolver::DependencyResolver;

pub struct ExecutionPlanBuilder {
    resolver: DependencyResolver,
}

impl Default for ExecutionPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionPlanBuilder {
    pub fn new() -> Self {
        Self { resolver: DependencyResolver::new() }
    }

    /// Build a plan for `project_id` from its pending `tasks`, owning
    /// `epics`, and a `max_worktrees` ceiling.
    ///
    /// 1. Batch tasks by `Hard`-dependency topological layer.
    /// 2. Predict file conflicts across the whole task set.
    /// 3. A batch is `can_parallel` only if it has 2+ tasks AND no predicted
    ///    conflict is a subset of the batch's task ids.
    /// 4. Assign worktrees: group tasks by epic, sort epics by task count
    ///    descending, give each of the first `max_worktrees` epics its own
    ///    worktree named `worktree-<slug(epic.name)>`; remaining epics
    ///    round-robin into the existing set. Tasks whose epic isn't in
    ///    `epics` fall into `worktree-default`.
    /// 5. Batches depend on every batch whose tasks contain a `Hard`
    ///    dependency of one of this batch's tasks.
    /// 6. Return the plan; caller persists it into project metadata.
    pub fn build(&self, project_id: Uuid, tasks: &[Task], epics: &[Epic], max_worktrees: usize) -> DomainResult<ExecutionPlan> {
        let layers = self.resolver.topological_batches(tasks)?;
        let conflicts = predict_conflicts(tasks);

        let tasks_by_id: HashMap<Uuid, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
        let mut batch_of_task: HashMap<Uuid, u32> = HashMap::new();
        let mut batches = Vec::with_capacity(layers.len());

        for (idx, layer) in layers.iter().enumerate() {
            for &task_id in layer {
                batch_of_task.insert(task_id, idx as u32);
            }
        }

        for (idx, layer) in layers.into_iter().enumerate() {
            let batch_id = idx as u32;
            let has_blocking_conflict = conflicts
                .iter()
                .any(|c| c.is_subset_of(&layer));
            let can_parallel = layer.len() >= 2 && !has_blocking_conflict;

            let mut depends_on: Vec<u32> = layer
                .iter()
                .filter_map(|id| tasks_by_id.get(id))
                .flat_map(|t| t.hard_dependencies())
                .filter_map(|dep| batch_of_task.get(&dep).copied())
                .filter(|&b| b != batch_id)
                .collect();
            depends_on.sort_unstable();
            depends_on.dedup();

            batches.push(Batch::new(batch_id, layer, can_parallel, depends_on));
        }

        let worktree_assignments = assign_worktrees(tasks, epics, max_worktrees);

        Ok(ExecutionPlan::new(project_id, batches, worktree_assignments, conflicts))
    }
}

/// Sanitize an epic name into a worktree-name-safe slug: lowercase,
/// non-alphanumeric/non-hyphen characters become hyphens, capped at 30
/// characters.
fn slugify(name: &str) -> String {
    let mut slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    slug.truncate(30);
    slug
}

/// Group tasks by epic, give the largest epics (by task count) their own
/// worktree up to `max_worktrees`, and round-robin the rest into the
/// existing set. Tasks whose epic id has no entry in `epics` (or epics
/// map isn't otherwise resolvable) land in `worktree-default`.
fn assign_worktrees(tasks: &[Task], epics: &[Epic], max_worktrees: usize) -> HashMap<Uuid, String> {
    let epics_by_id: HashMap<Uuid, &Epic> = epics.iter().map(|e| (e.id, e)).collect();

    let mut epic_tasks: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for task in tasks {
        epic_tasks.entry(task.epic_id).or_default().push(task.id);
    }

    let mut sorted_epics: Vec<(Uuid, usize)> =
        epic_tasks.iter().map(|(&epic_id, ids)| (epic_id, ids.len())).collect();
    sorted_epics.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut epic_to_worktree: HashMap<Uuid, String> = HashMap::new();
    let mut dedicated: Vec<String> = Vec::new();
    let mut overflow_idx = 0usize;

    for (epic_id, _) in &sorted_epics {
        match epics_by_id.get(epic_id) {
            None => {
                epic_to_worktree.insert(*epic_id, "worktree-default".to_string());
            }
            Some(epic) if dedicated.len() < max_worktrees => {
                let worktree_name = format!("worktree-{}", slugify(&epic.name));
                epic_to_worktree.insert(*epic_id, worktree_name.clone());
                dedicated.push(worktree_name);
            }
            Some(_) if !dedicated.is_empty() => {
                let worktree_name = dedicated[overflow_idx % dedicated.len()].clone();
                overflow_idx += 1;
                epic_to_worktree.insert(*epic_id, worktree_name);
            }
            Some(_) => {
                epic_to_worktree.insert(*epic_id, "worktree-default".to_string());
            }
        }
    }

    let mut assignments = HashMap::with_capacity(tasks.len());
    for (epic_id, task_ids) in &epic_tasks {
        let worktree = epic_to_worktree
            .get(epic_id)
            .cloned()
            .unwrap_or_else(|| "worktree-default".to_string());
        for task_id in task_ids {
            assignments.insert(*task_id, worktree.clone());
        }
    }
    assignments
}
