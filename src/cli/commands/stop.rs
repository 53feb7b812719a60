//! `forge stop`: request a running execution halt after its current batch.

use crate::app::ForgeApp;
use crate::cli::error::{CliError, CliResult};
use crate::domain::ports::ProjectRepository;

pub async fn run(app: &ForgeApp, project_name: String, _json: bool) -> CliResult<()> {
    let mut project = app
        .project_repo
        .get_by_name(&project_name)
        .await?
        .ok_or(CliError::UnknownProject(project_name))?;

    project.set_stop_requested(true);
    project.updated_at = chrono::Utc::now();
    app.project_repo.update(&project).await?;

    println!("stop requested for project {}", project.name);
    Ok(())
}
