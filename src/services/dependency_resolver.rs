//! Dependency resolution: cycle detection, topological batching and
//! critical-path analysis over a task set's `Hard` dependency edges.
//!
//! `Soft` edges are informational only — they never enter the graph built
//! here and can never force a cycle or a batch boundary.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Task;

#[derive(Debug, Clone, Default)]
pub struct DependencyResolver;

fn hard_graph(tasks: &[Task]) -> HashMap<Uuid, Vec<Uuid>> {
    let mut graph: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for task in tasks {
        graph.entry(task.id).or_default();
        for dep in task.hard_dependencies() {
            graph.entry(dep).or_default().push(task.id);
        }
    }
    graph
}

fn dfs_cycle(
    node: Uuid,
    graph: &HashMap<Uuid, Vec<Uuid>>,
    visited: &mut HashSet<Uuid>,
    rec_stack: &mut HashSet<Uuid>,
    path: &mut Vec<Uuid>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(&node) {
        for &neighbor in neighbors {
            if !visited.contains(&neighbor) {
                if dfs_cycle(neighbor, graph, visited, rec_stack, path) {
                    return true;
                }
            } else if rec_stack.contains(&neighbor) {
                if let Some(start) = path.iter().position(|&id| id == neighbor) {
                    path.drain(0..start);
                }
                return true;
            }
        }
    }

    rec_stack.remove(&node);
    path.pop();
    false
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Every `Hard` dependency a task names must point at a task in the
    /// same set (itself excluded).
    pub fn validate_dependencies(&self, task: &Task, available: &[Task]) -> DomainResult<()> {
        let available_ids: HashSet<Uuid> = available.iter().map(|t| t.id).collect();
        for dep in task.hard_dependencies() {
            if dep != task.id && !available_ids.contains(&dep) {
                return Err(DomainError::DanglingDependency {
                    task: task.id,
                    missing: dep,
                });
            }
        }
        Ok(())
    }

    /// Returns the offending cycle (task ids, in cycle order) if the `Hard`
    /// edges of `tasks` contain one.
    pub fn detect_cycle(&self, tasks: &[Task]) -> Option<Vec<Uuid>> {
        let graph = hard_graph(tasks);
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for task in tasks {
            if !visited.contains(&task.id)
                && dfs_cycle(task.id, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(path);
            }
        }
        None
    }

    /// Kahn's algorithm, partitioned into ready-frontier layers: batch N is
    /// every task whose `Hard` dependencies all finished in batches `0..N`.
    /// Each returned `Vec<Uuid>` is one layer; order across layers is
    /// dependency order, within a layer tasks are sorted by ascending
    /// `priority` (ties broken by id).
    pub fn topological_batches(&self, tasks: &[Task]) -> DomainResult<Vec<Vec<Uuid>>> {
        if let Some(cycle) = self.detect_cycle(tasks) {
            return Err(DomainError::CycleDetected(cycle[0]));
        }

        let by_id: HashMap<Uuid, &Task> = tasks.iter().map(|t| (t.id, t)).collect();

        let mut in_degree: HashMap<Uuid, usize> = HashMap::new();
        let mut dependents: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for task in tasks {
            in_degree.entry(task.id).or_insert(0);
            for dep in task.hard_dependencies() {
                dependents.entry(dep).or_default().push(task.id);
                *in_degree.entry(task.id).or_insert(0) += 1;
            }
        }

        let mut remaining = in_degree.clone();
        let mut resolved_count = 0;
        let mut batches = Vec::new();

        loop {
            let mut ready: Vec<Uuid> = remaining
                .iter()
                .filter(|&(_, &deg)| deg == 0)
                .map(|(&id, _)| id)
                .collect();
            if ready.is_empty() {
                break;
            }
            ready.sort_by_key(|id| (by_id[id].priority, *id));
            for id in &ready {
                remaining.remove(id);
                resolved_count += 1;
            }
            for id in &ready {
                if let Some(deps) = dependents.get(id) {
                    for &d in deps {
                        if let Some(deg) = remaining.get_mut(&d) {
                            *deg -= 1;
                        }
                    }
                }
            }
            batches.push(ready);
        }

        if resolved_count != tasks.len() {
            return Err(DomainError::EmptyPlan);
        }

        Ok(batches)
    }

    /// Longest `Hard`-edge chain ending at `task`, the critical-path length
    /// used to prioritize batch scheduling.
    pub fn critical_path_depth(&self, task: &Task, all_tasks: &[Task]) -> DomainResult<u32> {
        let by_id: HashMap<Uuid, &Task> = all_tasks.iter().map(|t| (t.id, t)).collect();
        let mut visiting = HashSet::new();
        depth_recursive(task, &by_id, &mut visiting)
    }
}

fn depth_recursive(
    task: &Task,
    by_id: &HashMap<Uuid, &Task>,
    visiting: &mut HashSet<Uuid>,
) -> DomainResult<u32> {
    if visiting.contains(&task.id) {
        return Err(DomainError::CycleDetected(task.id));
    }
    visiting.insert(task.id);

    let mut max_depth = 0;
    for dep in task.hard_dependencies() {
        if let Some(&dep_task) = by_id.get(&dep) {
            max_depth = max_depth.max(depth_recursive(dep_task, by_id, visiting)?.saturating_add(1));
        }
    }

    visiting.remove(&task.id);
    Ok(max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::task::Dependency;

    fn task_with_deps(epic: Uuid, hard_on: &[Uuid]) -> Task {
        let mut t = Task::new(epic, "do it", "edit file.rs", 0);
        for &d in hard_on {
            t.depends_on.push(Dependency::hard(d));
        }
        t
    }

    #[test]
    fn detects_no_cycle_in_chain() {
        let epic = Uuid::new_v4();
        let a = task_with_deps(epic, &[]);
        let b = task_with_deps(epic, &[a.id]);
        let resolver = DependencyResolver::new();
        assert!(resolver.detect_cycle(&[a, b]).is_none());
    }

    #[test]
    fn detects_cycle() {
        let epic = Uuid::new_v4();
        let mut a = task_with_deps(epic, &[]);
        let mut b = task_with_deps(epic, &[]);
        a.depends_on.push(Dependency::hard(b.id));
        b.depends_on.push(Dependency::hard(a.id));
        let resolver = DependencyResolver::new();
        assert!(resolver.detect_cycle(&[a, b]).is_some());
    }

    #[test]
    fn soft_edges_never_create_cycles() {
        let epic = Uuid::new_v4();
        let mut a = task_with_deps(epic, &[]);
        let mut b = task_with_deps(epic, &[]);
        a.depends_on.push(Dependency::soft(b.id));
        b.depends_on.push(Dependency::soft(a.id));
        let resolver = DependencyResolver::new();
        assert!(resolver.detect_cycle(&[a, b]).is_none());
    }

    #[test]
    fn topological_batches_layers_independent_tasks_together() {
        let epic = Uuid::new_v4();
        let a = task_with_deps(epic, &[]);
        let b = task_with_deps(epic, &[]);
        let c = task_with_deps(epic, &[a.id, b.id]);
        let resolver = DependencyResolver::new();
        let batches = resolver
            .topological_batches(&[a.clone(), b.clone(), c.clone()])
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1], vec![c.id]);
    }

    #[test]
    fn dangling_hard_dependency_rejected() {
        let epic = Uuid::new_v4();
        let t = task_with_deps(epic, &[Uuid::new_v4()]);
        let resolver = DependencyResolver::new();
        assert!(resolver.validate_dependencies(&t, &[]).is_err());
    }
}
