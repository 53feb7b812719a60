//! Project, epic, and task management commands.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;

use crate::app::ForgeApp;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Epic, Project, Task, TestCase};
use crate::domain::ports::{EpicRepository, ProjectRepository, TaskRepository, TestRepository};

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Register a new project rooted at a working directory
    Create {
        /// Project name
        name: String,
        /// Absolute path to the project's working directory
        working_dir: PathBuf,
    },
    /// List registered projects
    List,
    /// Add an epic (a unit of parallelizable work) to a project
    AddEpic {
        /// Project name
        project: String,
        /// Epic name
        name: String,
        /// Scheduling priority (higher runs earlier)
        #[arg(short, long, default_value = "0")]
        priority: i32,
    },
    /// Add a task to an epic
    AddTask {
        /// Epic ID
        epic_id: String,
        /// Human-readable description
        description: String,
        /// Instruction text sent to the agent
        action: String,
        #[arg(short, long, default_value = "0")]
        priority: i32,
    },
    /// Attach a test case to a task
    AddTest {
        /// Task ID
        task_id: String,
        /// Test category (e.g. unit, integration)
        category: String,
        /// Prose description of what the test verifies
        description: String,
        /// Ordered steps, one per flag
        #[arg(short, long)]
        step: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct ProjectOutput {
    id: String,
    name: String,
    working_dir: String,
}

impl From<&Project> for ProjectOutput {
    fn from(p: &Project) -> Self {
        Self { id: p.id.to_string(), name: p.name.clone(), working_dir: p.working_dir.display().to_string() }
    }
}

impl CommandOutput for ProjectOutput {
    fn to_human(&self) -> String {
        format!("{}  {}  {}", self.id, self.name, self.working_dir)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct ProjectListOutput {
    projects: Vec<ProjectOutput>,
}

impl CommandOutput for ProjectListOutput {
    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects registered.".to_string();
        }
        self.projects.iter().map(|p| p.to_human()).collect::<Vec<_>>().join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn run(app: &ForgeApp, command: ProjectCommands, json: bool) -> CliResult<()> {
    match command {
        ProjectCommands::Create { name, working_dir } => {
            let project = Project::new(name, working_dir);
            app.project_repo.create(&project).await?;
            output(&ProjectOutput::from(&project), json);
        }
        ProjectCommands::List => {
            let projects = app.project_repo.list().await?;
            output(&ProjectListOutput { projects: projects.iter().map(ProjectOutput::from).collect() }, json);
        }
        ProjectCommands::AddEpic { project, name, priority } => {
            let project = app
                .project_repo
                .get_by_name(&project)
                .await?
                .ok_or_else(|| CliError::UnknownProject(project.clone()))?;
            let epic = Epic::new(project.id, name, priority);
            app.epic_repo.create(&epic).await?;
            println!("{}", epic.id);
        }
        ProjectCommands::AddTask { epic_id, description, action, priority } => {
            let epic_id = epic_id.parse().map_err(|_| CliError::UnknownEpic(epic_id.clone()))?;
            let task = Task::new(epic_id, description, action, priority);
            app.task_repo.create(&task).await?;
            println!("{}", task.id);
        }
        ProjectCommands::AddTest { task_id, category, description, step } => {
            let parsed_task_id = task_id.parse().map_err(|_| CliError::UnknownTask(task_id.clone()))?;
            app.task_repo.get(parsed_task_id).await?.ok_or_else(|| CliError::UnknownTask(task_id.clone()))?;
            let mut test = TestCase::new(parsed_task_id, category, description);
            test.steps = step;
            app.test_repo.create(&test).await?;
            println!("{}", test.id);
        }
    }

    Ok(())
}
