//! Test-case domain model ("Test" entity in the data model — named
//! `TestCase` here to avoid shadowing Rust's own `#[test]`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub task_id: Uuid,
    pub category: String,
    pub description: String,
    pub steps: Vec<String>,
    pub passed: Option<bool>,
    pub result: serde_json::Value,
}

impl TestCase {
    pub fn new(task_id: Uuid, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            category: category.into(),
            description: description.into(),
            steps: Vec::new(),
            passed: None,
            result: serde_json::json!({}),
        }
    }
}
