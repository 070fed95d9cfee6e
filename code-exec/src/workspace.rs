use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;

/// Ephemeral directory owned by exactly one pipeline run.
///
/// The directory is removed by [`Workspace::destroy`], or by `Drop` when the
/// owner never got that far (panic, cancelled future).
#[derive(Debug)]
pub struct Workspace {
    /// Root directory for this run
    root_dir: PathBuf,
    /// Unique ID for this workspace instance
    id: String,
    released: bool,
}

impl Workspace {
    /// Create a fresh workspace under `base`, named by a random token
    pub async fn create(base: impl AsRef<Path>) -> Result<Self, Error> {
        let id = Uuid::new_v4().to_string();
        let root_dir = base.as_ref().join(&id);

        fs::create_dir_all(&root_dir).await.map_err(|e| {
            Error::Workspace(format!(
                "Failed to create workspace directory {}: {}",
                root_dir.display(),
                e
            ))
        })?;
        debug!("Created workspace {}", root_dir.display());

        Ok(Workspace {
            root_dir,
            id,
            released: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Write `contents` to `name` inside the workspace, creating parents as
    /// needed and replacing any existing file.
    pub async fn write_source(&self, name: &str, contents: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(Error::Workspace(format!(
                "Refusing to write outside the workspace: {name}"
            )));
        }

        let path = self.root_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::Workspace(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(&path, contents).await.map_err(|e| {
            Error::Workspace(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    /// Remove the whole workspace. Removing an already-missing directory is
    /// not an error, and failures are logged rather than returned.
    pub async fn destroy(mut self) {
        self.released = true;
        match fs::remove_dir_all(&self.root_dir).await {
            Ok(()) => debug!("Removed workspace {}", self.root_dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to clean up workspace {}: {}",
                self.root_dir.display(),
                e
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.root_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to clean up workspace {}: {}",
                self.root_dir.display(),
                e
            ),
        }
    }
}
