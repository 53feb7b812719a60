//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Configuration validation
//! - Type-safe config structs

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};

use crate::infrastructure::logging::{LogConfig, LogFormat};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path(), max_connections: default_max_connections() }
    }
}

fn default_db_path() -> String {
    ".forge/forge.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Budget-pressure thresholds and per-pressure concurrency caps, mirroring
/// [`crate::services::budget_tracker::BudgetTrackerConfig`] so the loaded
/// config can be handed straight to the tracker's constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default)]
    pub total_budget_cents: i64,
    #[serde(default = "default_caution")]
    pub caution_threshold_pct: f64,
    #[serde(default = "default_warning")]
    pub warning_threshold_pct: f64,
    #[serde(default = "default_critical")]
    pub critical_threshold_pct: f64,
    #[serde(default = "default_concurrency_normal")]
    pub max_concurrency_normal: usize,
    #[serde(default = "default_concurrency_caution")]
    pub max_concurrency_caution: usize,
    #[serde(default = "default_concurrency_warning")]
    pub max_concurrency_warning: usize,
    #[serde(default = "default_concurrency_critical")]
    pub max_concurrency_critical: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total_budget_cents: 0,
            caution_threshold_pct: default_caution(),
            warning_threshold_pct: default_warning(),
            critical_threshold_pct: default_critical(),
            max_concurrency_normal: default_concurrency_normal(),
            max_concurrency_caution: default_concurrency_caution(),
            max_concurrency_warning: default_concurrency_warning(),
            max_concurrency_critical: default_concurrency_critical(),
        }
    }
}

fn default_caution() -> f64 {
    0.60
}
fn default_warning() -> f64 {
    0.80
}
fn default_critical() -> f64 {
    0.95
}
fn default_concurrency_normal() -> usize {
    8
}
fn default_concurrency_caution() -> usize {
    4
}
fn default_concurrency_warning() -> usize {
    2
}
fn default_concurrency_critical() -> usize {
    1
}

/// VCS subprocess and merge-gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsConfig {
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    #[serde(default = "default_vcs_timeout_secs")]
    pub command_timeout_secs: u64,
    pub test_command: Option<String>,
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            main_branch: default_main_branch(),
            command_timeout_secs: default_vcs_timeout_secs(),
            test_command: None,
            test_timeout_secs: default_test_timeout_secs(),
        }
    }
}

fn default_main_branch() -> String {
    "main".to_string()
}
fn default_vcs_timeout_secs() -> u64 {
    60
}
fn default_test_timeout_secs() -> u64 {
    300
}

/// Root configuration for the engine, hierarchically loaded by
/// [`ConfigLoader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    /// Ceiling on dedicated worktrees the Execution Plan Builder hands out
    /// one-per-epic before it starts round-robining epics into the
    /// existing set.
    #[serde(default = "default_max_worktrees")]
    pub max_worktrees: usize,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub vcs: VcsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_agents: default_max_agents(),
            max_worktrees: default_max_worktrees(),
            database: DatabaseConfig::default(),
            logging: LogConfig::default(),
            budget: BudgetConfig::default(),
            vcs: VcsConfig::default(),
        }
    }
}

fn default_max_agents() -> usize {
    8
}

fn default_max_worktrees() -> usize {
    4
}

impl Config {
    pub fn log_format_str(&self) -> &'static str {
        match self.logging.format {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}
