//! Forge Engine — a dependency-batched, worktree-isolated parallel
//! execution engine for code agent orchestration.
//!
//! - Dependency Resolver and Execution Plan Builder with file-conflict
//!   prediction and worktree pre-assignment
//! - Worktree Manager, Model Selector, and Budget Tracker
//! - Parallel Executor, Merge Validator, and Batch Executor
//! - Expertise & Learning Context injected into agent prompts

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
