//! `forge plan`: build and persist an execution plan from a project's
//! pending tasks.

use serde::Serialize;

use crate::app::ForgeApp;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output::{output, CommandOutput};
use crate::domain::ports::{EpicRepository, PlanRepository, ProjectRepository, TaskRepository};
use crate::services::select_mode;

#[derive(Debug, Serialize)]
struct PlanOutput {
    batches: usize,
    total_tasks: usize,
    parallel_possible: usize,
    conflicts_detected: usize,
    high_conflict_rate_warning: bool,
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        format!(
            "plan built: {} batches, {} tasks, {} parallel-eligible, {} predicted conflicts{}",
            self.batches,
            self.total_tasks,
            self.parallel_possible,
            self.conflicts_detected,
            if self.high_conflict_rate_warning { " (high conflict rate)" } else { "" }
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn run(app: &ForgeApp, project_name: String, json: bool) -> CliResult<()> {
    let mut project = app
        .project_repo
        .get_by_name(&project_name)
        .await?
        .ok_or(CliError::UnknownProject(project_name))?;

    let epics = app.epic_repo.list_for_project(project.id).await?;
    let tasks = app.task_repo.list_pending_for_project(project.id).await?;

    let plan = app.plan_builder.build(project.id, &tasks, &epics, app.config.max_worktrees)?;
    let validation = plan.validate();

    project.execution_mode = Some(select_mode(&plan));
    project.updated_at = chrono::Utc::now();
    app.project_repo.update(&project).await?;
    app.plan_repo.save_plan(project.id, &plan).await?;

    if !validation.is_valid() {
        for err in &validation.errors {
            tracing::warn!(project = %project.name, "plan validation: {err}");
        }
    }

    output(
        &PlanOutput {
            batches: plan.batches.len(),
            total_tasks: plan.metadata.total_tasks,
            parallel_possible: plan.metadata.parallel_possible,
            conflicts_detected: plan.metadata.conflicts_detected,
            high_conflict_rate_warning: validation.high_conflict_rate_warning,
        },
        json,
    );

    Ok(())
}
