//! Epic domain model.
//!
//! An epic is a named grouping of tasks and the unit that owns a worktree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    /// Lower priority value schedules earlier.
    pub priority: i32,
    pub depends_on: Vec<Uuid>,
}

impl Epic {
    pub fn new(project_id: Uuid, name: impl Into<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            priority,
            depends_on: Vec::new(),
        }
    }
}
