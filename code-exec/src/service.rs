use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::{
    config::SandboxConfig,
    error::Error,
    executor::CodeExecutor,
    runner::CommandRunner,
    types::{ExecutionOutcome, ExecutionRequest, FailureKind},
};

/// Admission-controlled entry point: at most `max_concurrent_executions`
/// pipelines run at once, the rest wait for a permit.
#[derive(Clone)]
pub struct CodeExecutionService {
    executor: Arc<CodeExecutor>,
    semaphore: Arc<Semaphore>,
    max_concurrent_executions: usize,
}

impl CodeExecutionService {
    pub fn new(config: SandboxConfig) -> Result<Self, Error> {
        config.validate()?;
        let executor = CodeExecutor::new(&config);
        Ok(Self::from_parts(executor, config.max_concurrent_executions))
    }

    /// Build a service around a custom process runner
    pub fn with_runner(
        config: SandboxConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let executor = CodeExecutor::with_runner(&config, runner);
        Ok(Self::from_parts(executor, config.max_concurrent_executions))
    }

    fn from_parts(executor: CodeExecutor, max_concurrent_executions: usize) -> Self {
        Self {
            executor: Arc::new(executor),
            semaphore: Arc::new(Semaphore::new(max_concurrent_executions)),
            max_concurrent_executions,
        }
    }

    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        // Acquire execution permit
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Failed to acquire execution permit: {}", e);
                return ExecutionOutcome::failure(
                    FailureKind::InternalError,
                    format!("Failed to acquire execution permit: {e}"),
                );
            }
        };

        debug!("Starting code execution for language: {}", request.language);
        let started = Instant::now();

        let outcome = self
            .executor
            .execute(&request.code, &request.language)
            .await;

        match &outcome {
            ExecutionOutcome::Success { .. } => info!(
                "Code execution ({}) completed in {:?}",
                request.language,
                started.elapsed()
            ),
            ExecutionOutcome::Failure {
                kind: FailureKind::InternalError,
                message,
            } => error!("Code execution ({}) failed: {}", request.language, message),
            ExecutionOutcome::Failure { kind, .. } => warn!(
                "Code execution ({}) finished with {} after {:?}",
                request.language,
                kind,
                started.elapsed()
            ),
        }

        outcome
    }

    pub fn get_available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent_executions(&self) -> usize {
        self.max_concurrent_executions
    }
}
