//! # Code Execution Service
//!
//! Runs one-shot source snippets in many languages by driving the host's
//! interpreters and compilers as child processes. Every request gets its own
//! throwaway workspace directory and a hard per-phase deadline.
//!
//! This is not a security sandbox: executed programs can reach the
//! filesystem and network like any other process of the service user.

mod config;
mod error;
mod executor;
pub mod languages;
mod runner;
mod service;
mod types;
mod workspace;

#[cfg(test)]
mod tests;

pub use config::{SandboxConfig, DEFAULT_MAX_CONCURRENT_EXECUTIONS, DEFAULT_TIMEOUT};
pub use error::Error;
pub use executor::CodeExecutor;
pub use languages::{Language, LanguageProfile};
pub use runner::{CommandRunner, CommandSpec, ProcessRunner};
pub use service::CodeExecutionService;
pub use types::{ExecutionOutcome, ExecutionRequest, FailureKind, NO_OUTPUT};
pub use workspace::Workspace;

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;
