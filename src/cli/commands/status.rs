//! `forge status`: epics, tasks, worktrees, and budget for a project.

use comfy_table::{presets, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::app::ForgeApp;
use crate::cli::error::{CliError, CliResult};
use crate::domain::ports::{EpicRepository, ProjectRepository, TaskFilter, TaskRepository, WorktreeRepository};

#[derive(Debug, Serialize)]
struct StatusOutput {
    project: String,
    epics: usize,
    tasks_total: usize,
    tasks_done: usize,
    worktrees_active: usize,
    budget_spent_cents: i64,
    budget_remaining_cents: i64,
}

pub async fn run(app: &ForgeApp, project_name: String, json: bool) -> CliResult<()> {
    let project = app
        .project_repo
        .get_by_name(&project_name)
        .await?
        .ok_or(CliError::UnknownProject(project_name))?;

    let epics = app.epic_repo.list_for_project(project.id).await?;
    let tasks = app.task_repo.list(TaskFilter::default()).await?;
    let project_tasks: Vec<_> = {
        let epic_ids: std::collections::HashSet<_> = epics.iter().map(|e| e.id).collect();
        tasks.into_iter().filter(|t| epic_ids.contains(&t.epic_id)).collect()
    };
    let worktrees = app.worktree_repo.list_for_project(project.id).await?;
    let budget = app.budget_tracker.snapshot(project.id).await?;

    let summary = StatusOutput {
        project: project.name.clone(),
        epics: epics.len(),
        tasks_total: project_tasks.len(),
        tasks_done: project_tasks.iter().filter(|t| t.done).count(),
        worktrees_active: worktrees.iter().filter(|w| w.status == crate::domain::models::WorktreeStatus::Active).count(),
        budget_spent_cents: budget.spent_cents,
        budget_remaining_cents: budget.remaining_cents,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("field"), Cell::new("value")]);
    table.add_row(vec!["project", &summary.project]);
    table.add_row(vec!["epics", &summary.epics.to_string()]);
    table.add_row(vec!["tasks", &format!("{}/{}", summary.tasks_done, summary.tasks_total)]);
    table.add_row(vec!["active worktrees", &summary.worktrees_active.to_string()]);
    table.add_row(vec!["budget pressure", &format!("{:?}", budget.pressure)]);
    table.add_row(vec!["budget spent", &format!("{}c", summary.budget_spent_cents)]);
    table.add_row(vec!["budget remaining", &format!("{}c", summary.budget_remaining_cents)]);

    println!("{table}");

    Ok(())
}
