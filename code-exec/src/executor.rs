use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::{
    config::SandboxConfig,
    error::Error,
    languages::{self, Bindings, ExecutionMode, Invocation, LanguageProfile},
    runner::{CommandRunner, CommandSpec, ProcessRunner},
    types::{ExecutionOutcome, FailureKind},
    workspace::Workspace,
};

/// Stem of the staged source file for languages without a derived name
const SOURCE_STEM: &str = "code";

/// Stem of the binary produced by native compilers
const ARTIFACT_STEM: &str = "output";

/// Source and artifact locations for one staged run
struct Staged {
    source: PathBuf,
    artifact: OsString,
}

impl Staged {
    fn bindings(&self) -> Bindings<'_> {
        Bindings {
            source: &self.source,
            artifact: &self.artifact,
        }
    }
}

/// Resolves a language, stages the source in a fresh workspace, compiles if
/// needed, runs, and always tears the workspace down.
pub struct CodeExecutor {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    workspace_root: PathBuf,
}

impl CodeExecutor {
    /// Create a code executor backed by real processes
    pub fn new(config: &SandboxConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(config: &SandboxConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout: config.timeout,
            workspace_root: config.workspace_root.clone(),
        }
    }

    /// Execute `code` as `language_id`. Never fails: every error is reported
    /// as an [`ExecutionOutcome::Failure`].
    pub async fn execute(&self, code: &str, language_id: &str) -> ExecutionOutcome {
        let Some(profile) = languages::lookup(language_id) else {
            return ExecutionOutcome::failure(
                FailureKind::UnsupportedLanguage,
                languages::unsupported_message(language_id),
            );
        };

        let workspace = match Workspace::create(&self.workspace_root).await {
            Ok(workspace) => workspace,
            Err(e) => {
                error!("Failed to allocate workspace: {}", e);
                return ExecutionOutcome::failure(FailureKind::InternalError, e.to_string());
            }
        };
        debug!(
            "Executing {} in workspace {}",
            profile.id,
            workspace.id()
        );

        let outcome = match self.run_in_workspace(profile, code, &workspace).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Execution of {} failed: {}", profile.id, e);
                ExecutionOutcome::failure(FailureKind::InternalError, e.to_string())
            }
        };

        workspace.destroy().await;
        outcome
    }

    async fn run_in_workspace(
        &self,
        profile: &LanguageProfile,
        code: &str,
        workspace: &Workspace,
    ) -> Result<ExecutionOutcome, Error> {
        let (file_name, artifact) = match layout(profile, code, workspace.root()) {
            Ok(layout) => layout,
            Err(outcome) => return Ok(outcome),
        };
        let source = workspace.write_source(&file_name, code).await?;
        let staged = Staged { source, artifact };

        if let Some(compile) = profile.mode.compile() {
            let outcome = self
                .invoke(compile, &staged, workspace)
                .await
                .reclassify_runtime(FailureKind::CompileError);
            if !outcome.is_success() {
                debug!("Compilation of {} failed, skipping run", profile.id);
                return Ok(outcome);
            }
        }

        Ok(self.invoke(profile.mode.run(), &staged, workspace).await)
    }

    async fn invoke(
        &self,
        invocation: &Invocation,
        staged: &Staged,
        workspace: &Workspace,
    ) -> ExecutionOutcome {
        let (program, args) = invocation.render(&staged.bindings());
        self.runner
            .run(CommandSpec {
                program,
                args,
                working_dir: workspace.root().to_path_buf(),
                deadline: self.timeout,
            })
            .await
    }
}

/// Source file name and compile artifact for `profile`. A derived-name
/// language whose entry point cannot be found yields the failure instead.
fn layout(
    profile: &LanguageProfile,
    code: &str,
    root: &Path,
) -> Result<(String, OsString), ExecutionOutcome> {
    match profile.mode {
        ExecutionMode::Interpret { .. } => Ok((
            format!("{SOURCE_STEM}.{}", profile.extension),
            OsString::new(),
        )),
        ExecutionMode::CompileThenRun { .. } => {
            let artifact =
                root.join(format!("{ARTIFACT_STEM}{}", std::env::consts::EXE_SUFFIX));
            Ok((
                format!("{SOURCE_STEM}.{}", profile.extension),
                artifact.into_os_string(),
            ))
        }
        ExecutionMode::CompileThenRunWithDerivedName { entry_point, .. } => {
            match entry_point(code) {
                Some(name) => Ok((format!("{name}.{}", profile.extension), name.into())),
                None => Err(ExecutionOutcome::failure(
                    FailureKind::InternalError,
                    format!("No public class found in {} code", profile.display_name),
                )),
            }
        }
    }
}
