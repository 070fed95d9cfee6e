use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Placeholder reported when a program succeeds without writing to stdout
pub const NO_OUTPUT: &str = "Code executed successfully (no output)";

/// Code execution request, as received from callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code to execute
    #[serde(default)]
    pub code: String,
    /// Language identifier, matched case-insensitively
    #[serde(default)]
    pub language: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }
}

/// Classification of a failed execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedLanguage,
    CompileError,
    RuntimeError,
    Timeout,
    ToolchainMissing,
    InternalError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::UnsupportedLanguage => "unsupported_language",
            FailureKind::CompileError => "compile_error",
            FailureKind::RuntimeError => "runtime_error",
            FailureKind::Timeout => "timeout",
            FailureKind::ToolchainMissing => "toolchain_missing",
            FailureKind::InternalError => "internal_error",
        };
        f.write_str(name)
    }
}

/// Terminal result of a process run or of a whole pipeline run.
///
/// Serializes to the wire shape `{"success": true, "output": ..}` or
/// `{"success": false, "error": ..}`; the failure kind stays server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success { output: String },
    Failure { kind: FailureKind, message: String },
}

impl ExecutionOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        ExecutionOutcome::Success {
            output: output.into(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ExecutionOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(deadline: Duration) -> Self {
        Self::failure(
            FailureKind::Timeout,
            format!("Execution timeout ({} seconds)", format_secs(deadline)),
        )
    }

    pub fn toolchain_missing(command: &str) -> Self {
        Self::failure(
            FailureKind::ToolchainMissing,
            format!("Command '{command}' not found. Please install {command}."),
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Success { output } => Some(output),
            ExecutionOutcome::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure { message, .. } => Some(message),
        }
    }

    /// Relabels a runtime failure, leaving every other outcome untouched.
    /// Used for the compile phase, where a non-zero exit means rejected source.
    pub fn reclassify_runtime(self, kind: FailureKind) -> Self {
        match self {
            ExecutionOutcome::Failure {
                kind: FailureKind::RuntimeError,
                message,
            } => ExecutionOutcome::Failure { kind, message },
            other => other,
        }
    }
}

impl Serialize for ExecutionOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ExecutionOutcome", 2)?;
        match self {
            ExecutionOutcome::Success { output } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("output", output)?;
            }
            ExecutionOutcome::Failure { message, .. } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", message)?;
            }
        }
        state.end()
    }
}

// 10s -> "10", 2.5s -> "2.5"
fn format_secs(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{}", duration.as_secs_f64())
    }
}

pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
