//! Per-run workspace lifecycle
//!
//! Each execution gets its own private temporary directory. The directory is
//! removed when the [`Workspace`] is dropped, whichever way the run ends.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, instrument};

use crate::sandbox::SandboxError;

/// A private scratch directory holding one harness bundle
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `parent`, or the system temp dir
    pub fn create(parent: Option<&Path>) -> Result<Self, SandboxError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("labrun-");

        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(SandboxError::WorkspaceFailed)?;

        debug!(path = ?dir.path(), "workspace created");
        Ok(Self { dir })
    }

    /// Get the path to the workspace directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Get the path to a file inside the workspace
    ///
    /// Only plain file names are accepted.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, SandboxError> {
        if name.is_empty() || name.contains("..") || name.contains('/') {
            return Err(SandboxError::InvalidPath(name.to_string()));
        }
        Ok(self.dir.path().join(name))
    }

    /// Write a file into the workspace
    #[instrument(skip(self, content))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<(), SandboxError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to workspace");
        Ok(())
    }
}
