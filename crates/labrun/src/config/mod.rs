use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::policy::{
    ATTRIBUTE_REASON, DEFAULT_ALLOWED_BUILTINS, DEFAULT_DENIED_ATTRIBUTES, DEFAULT_DENIED_NAMES,
    DEFAULT_DYNAMIC_EVAL, DYNAMIC_EVAL_REASON, FORBIDDEN_BUILTINS, IMPORT_REASON, Policy,
};

mod loader;
pub mod policy;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../labrun.example.toml");

/// Default wall-clock limit in seconds
pub const DEFAULT_TIMEOUT: f64 = 3.0;

/// Default cap on returned stdout, in characters
pub const DEFAULT_STDOUT_CAP: usize = 6000;

/// Default cap on interpreter diagnostics, in characters
pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for labrun
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Python interpreter used to run the harness (resolved from PATH when bare)
    ///
    /// Must name a real interpreter binary. The child starts with an empty
    /// environment, so version-manager shims (pyenv, asdf) that read their
    /// own variables fail with a runner error.
    #[serde(default = "default_python_path")]
    pub python_path: PathBuf,

    /// Flags passed to the interpreter ahead of the harness path.
    ///
    /// The defaults put CPython in isolated mode (`-I`: no user site, no
    /// `PYTHON*` variables, script directory not on `sys.path`), disable
    /// bytecode caching (`-B`) and skip the `site` module (`-S`).
    #[serde(default = "default_interpreter_flags")]
    pub interpreter_flags: Vec<String>,

    /// Wall-clock limit in seconds, used when a request does not give one
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Maximum characters of captured stdout returned to the caller
    #[serde(default = "default_stdout_cap")]
    pub stdout_cap: usize,

    /// Maximum characters of interpreter diagnostics in runner errors
    #[serde(default = "default_diagnostic_limit")]
    pub diagnostic_limit: usize,

    /// Parent directory for per-run workspaces (system temp dir when unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Allow/deny policy for submissions
    #[serde(default)]
    pub policy: Policy,
}

impl Config {
    /// Create a new config from the embedded defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the wall-clock limit for a run, preferring the request's value
    pub fn effective_timeout(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
            _ => self.timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_python_path() -> PathBuf {
    PathBuf::from("python3")
}

fn default_interpreter_flags() -> Vec<String> {
    ["-I", "-B", "-S"].iter().map(|s| (*s).to_owned()).collect()
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT
}

fn default_stdout_cap() -> usize {
    DEFAULT_STDOUT_CAP
}

fn default_diagnostic_limit() -> usize {
    DEFAULT_DIAGNOSTIC_LIMIT
}
