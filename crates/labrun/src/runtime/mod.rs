//! Sandboxed-language runtime abstraction
//!
//! The pipeline only needs two things from the language it sandboxes: a
//! parser that reduces source to the syntax facts the policy cares about, and
//! a way to launch the harness program in an interpreter. [`ScriptRuntime`]
//! captures both so validation, composition, execution and decoding can be
//! exercised with any runtime plugged in.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::runtime::python::PythonRuntime;

mod python;

/// Source that failed to parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A syntax fact relevant to the allow/deny policy
///
/// Runtimes emit these in pre-order: a node always precedes the nodes nested
/// inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// A module import of any form
    Import,

    /// Attribute access `value.attr`
    Attribute(String),

    /// A bare name reference
    Name(String),

    /// A call; `callee` is set when the callee is a bare name
    Call { callee: Option<String> },
}

/// Program and arguments used to launch the harness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// A language runtime able to host sandboxed submissions
pub trait ScriptRuntime: Send + Sync {
    /// Human-readable runtime name, used in logs
    fn name(&self) -> &str;

    /// File extension for program files, without the dot
    fn extension(&self) -> &str;

    /// Parse source into policy-relevant syntax facts
    fn parse(&self, source: &str) -> Result<Vec<SyntaxNode>, SyntaxError>;

    /// The harness program executed in the child process
    fn harness_program(&self) -> &str;

    /// Command line that runs `harness` with the given payload files.
    ///
    /// All paths are relative to the workspace the child is started in.
    fn invocation(&self, harness: &Path, submission: &Path, manifest: &Path) -> Invocation;
}
