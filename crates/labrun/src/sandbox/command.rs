//! Command builder for the interpreter child process

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::runtime::Invocation;

/// Builder for a locked-down child process
///
/// The child never inherits the parent's environment or stdin. Its stdout
/// and stderr are always piped, and it is killed if its handle is dropped.
#[derive(Debug)]
pub struct SandboxCommand {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl SandboxCommand {
    /// Create a builder for `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Create a builder from a runtime invocation
    pub fn from_invocation(invocation: Invocation) -> Self {
        Self::new(invocation.program).args(invocation.args)
    }

    /// Replace the program, keeping arguments
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Append arguments
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory of the child
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Get the program path
    pub fn program_path(&self) -> &std::path::Path {
        &self.program
    }

    /// Get the argument list
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Build the tokio command
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}
