//! Agent runtime adapters.

pub mod mock_runtime;

pub use mock_runtime::{MockAgentRuntime, MockOutcome};
