//! Isolated process executor
//!
//! Writes a harness bundle into a private workspace, runs it under the
//! runtime's interpreter with a cleared environment and a hard wall-clock
//! limit, and reports what happened as a [`RawOutcome`].

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::sandbox::command::SandboxCommand;
pub use crate::sandbox::process::{ExecuteOptions, execute};
pub use crate::sandbox::workspace::Workspace;

mod command;
mod process;
mod workspace;

/// Errors that prevent a harness from being run at all
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create workspace: {0}")]
    WorkspaceFailed(#[source] std::io::Error),

    #[error("invalid workspace file name: {0}")]
    InvalidPath(String),

    #[error("interpreter not found: {0}")]
    ProgramNotFound(PathBuf),

    #[error("failed to spawn interpreter: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(f64),

    #[error("output reader failed: {0}")]
    ReaderFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Executor output before decoding
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// The wall-clock limit expired and the child was killed
    TimedOut { limit: f64 },

    /// The child exited unsuccessfully; carries its trimmed, capped diagnostic
    RunnerError { diagnostic: String },

    /// The child exited successfully
    Exited { stdout: String },
}

/// Resolve a program name to a path using the host's PATH.
///
/// The child runs with a cleared environment, so bare names like `python3`
/// must be resolved before spawning. Programs that contain a `/` are checked
/// for existence and otherwise left unchanged. Shims found on PATH are
/// returned as is and fail at run time without their environment.
pub fn resolve_program(program: &Path) -> Result<PathBuf, SandboxError> {
    if program.components().count() > 1 || program.is_absolute() {
        return if program.is_file() {
            Ok(program.to_path_buf())
        } else {
            Err(SandboxError::ProgramNotFound(program.to_path_buf()))
        };
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| SandboxError::ProgramNotFound(program.to_path_buf()))
}
