//! Concrete version-control subprocess adapter.

pub mod git_invoker;

pub use git_invoker::GitInvoker;
