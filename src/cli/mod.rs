//! CLI interface module.
//!
//! Command definitions, handlers, and table/JSON output formatting for the
//! `forge` binary.

pub mod commands;
pub mod error;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};
