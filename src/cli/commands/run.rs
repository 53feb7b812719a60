//! `forge run`: execute a previously built plan to completion.

use clap::Args;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app::ForgeApp;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output::{output, CommandOutput};
use crate::domain::ports::{PlanRepository, ProjectRepository};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project name
    pub project: String,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    success: bool,
    batches_completed: usize,
    batches_total: usize,
    stopped_early: bool,
    total_cost_cents: i64,
    total_duration_secs: f64,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        format!(
            "{}: {}/{} batches completed in {:.1}s, cost {}c{}",
            if self.success { "success" } else { "failed" },
            self.batches_completed,
            self.batches_total,
            self.total_duration_secs,
            self.total_cost_cents,
            if self.stopped_early { " (stopped early)" } else { "" }
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn run(app: &ForgeApp, args: RunArgs, json: bool) -> CliResult<()> {
    let mut project = app
        .project_repo
        .get_by_name(&args.project)
        .await?
        .ok_or(CliError::UnknownProject(args.project))?;

    let plan = app.plan_repo.load_plan(project.id).await?.ok_or(crate::domain::errors::DomainError::EmptyPlan)?;

    let (tx, mut rx) = mpsc::channel::<crate::services::batch_executor::ProgressEvent>(32);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(event_type = event.event_type, batch_id = event.batch_id, "{}", event.detail);
        }
    });

    let cancel = CancellationToken::new();
    let report = app
        .batch_executor()
        .execute_plan(&mut project, &plan, tx, cancel, app.config.budget.total_budget_cents)
        .await?;

    output(
        &RunOutput {
            success: report.success,
            batches_completed: report.batches_completed,
            batches_total: report.batches_total,
            stopped_early: report.stopped_early,
            total_cost_cents: report.total_cost_cents,
            total_duration_secs: report.total_duration.as_secs_f64(),
        },
        json,
    );

    Ok(())
}
