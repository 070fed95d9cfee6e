use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{error::Error, types::duration_serde};

/// Per-phase deadline applied when nothing else is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of pipelines allowed to run at once
pub const DEFAULT_MAX_CONCURRENT_EXECUTIONS: usize = 10;

/// Subdirectory of the system temp dir that holds all workspaces
pub const WORKSPACE_DIR_NAME: &str = "code-exec";

/// Runtime settings for the execution service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Deadline for each compile or run phase, in seconds
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// Admission limit in front of the pipeline
    pub max_concurrent_executions: usize,
    /// Directory under which per-request workspaces are created
    pub workspace_root: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_concurrent_executions: DEFAULT_MAX_CONCURRENT_EXECUTIONS,
            workspace_root: std::env::temp_dir().join(WORKSPACE_DIR_NAME),
        }
    }
}

impl SandboxConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        let config: SandboxConfig =
            toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        if self.max_concurrent_executions == 0 {
            return Err(Error::Config(
                "max_concurrent_executions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
