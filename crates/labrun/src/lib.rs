//! A library for running learner submissions in a sandbox.
//!
//! labrun takes a snippet of Python source plus an optional test
//! specification and returns a structured verdict: whether the snippet passed
//! the static safety gate, whether it ran without error, whether it satisfied
//! the tests, and what it printed.
//!
//! # Pipeline
//!
//! - **Validation**: the source is parsed in-process and rejected if it
//!   imports modules, touches dunder attributes or names a denied builtin. A
//!   rejected submission never starts a process.
//! - **Composition**: the submission is bundled with a fixed harness program
//!   and a JSON job manifest. Source is never spliced into program text.
//! - **Execution**: the bundle runs in a private temporary directory under an
//!   isolated interpreter with a cleared environment and a hard timeout.
//! - **Decoding**: the harness's final output line becomes an
//!   [`ExecutionResult`], with a well-formed result for every failure mode.
//!
//! ```rust,ignore
//! let runner = labrun::Runner::new(labrun::Config::default());
//! let result = runner.run("print('hello')", None, None).await;
//! assert_eq!(result.stdout, "hello\n");
//! ```

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Policy};
pub use harness::{Harness, compose};
pub use runner::{RunReport, Runner};
pub use runtime::{PythonRuntime, ScriptRuntime, SyntaxError, SyntaxNode};
pub use sandbox::{RawOutcome, SandboxError};
pub use types::{
    ExecutionResult, FailureKind, FunctionCase, RunRequest, Stage, TestOutcome, TestSpec,
    ValidationVerdict,
};
pub use validator::{StaticValidator, validate};

pub mod config;
pub mod decode;
pub mod harness;
pub mod runner;
pub mod runtime;
pub mod sandbox;
pub mod types;
pub mod validator;
