//! Submission runner for labrun
//!
//! Provides the high-level pipeline: validate, compose, execute, decode.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::decode::{decode, runner_error_message};
use crate::harness::compose;
use crate::runtime::{PythonRuntime, ScriptRuntime};
use crate::sandbox::{ExecuteOptions, execute};
use crate::types::{
    ExecutionResult, FailureKind, RunRequest, Stage, TestOutcome, TestSpec, ValidationVerdict,
};
use crate::validator::StaticValidator;

/// A result together with the stage the submission ended in
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub stage: Stage,
    pub result: ExecutionResult,
}

impl RunReport {
    /// Classify a failed run
    ///
    /// `None` when the result is ok, or when the submission ran cleanly and
    /// only returned wrong answers.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.result.ok {
            return None;
        }
        if let Some(kind) = self.stage.failure_kind() {
            return Some(kind);
        }

        let test_failed = self.result.tests.iter().any(|outcome| {
            matches!(
                outcome,
                TestOutcome::MissingFunction { .. }
                    | TestOutcome::Case {
                        error: Some(_),
                        ..
                    }
            )
        });
        match &self.result.error {
            Some(error) if error.starts_with("Test harness error:") => {
                Some(FailureKind::TestEvaluation)
            }
            Some(_) => Some(FailureKind::Execution),
            None if test_failed => Some(FailureKind::TestEvaluation),
            // Tests ran and some returned the wrong value
            None => None,
        }
    }
}

/// High-level runner for submissions
///
/// Cheap to clone and safe to share; each run owns its own workspace and
/// child process.
#[derive(Clone)]
pub struct Runner {
    config: Arc<Config>,
    runtime: Arc<dyn ScriptRuntime>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("runtime", &self.runtime.name())
            .finish()
    }
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        let runtime = Arc::new(PythonRuntime::from_config(&config));
        Self::with_runtime(config, runtime)
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Create a runner backed by a custom runtime
    pub fn with_runtime(config: Config, runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self {
            config: Arc::new(config),
            runtime,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the runtime
    pub fn runtime(&self) -> &dyn ScriptRuntime {
        self.runtime.as_ref()
    }

    /// Statically check a submission without running it
    pub fn validate(&self, source: &str) -> ValidationVerdict {
        StaticValidator::new(&self.config.policy).validate(self.runtime.as_ref(), source)
    }

    /// Run a submission and return its verdict
    ///
    /// Never fails: every failure mode is reported inside the result.
    pub async fn run(
        &self,
        source: &str,
        tests: Option<&TestSpec>,
        timeout: Option<f64>,
    ) -> ExecutionResult {
        self.run_report(source, tests, timeout).await.result
    }

    /// Run a posted request
    pub async fn run_request(&self, request: &RunRequest) -> ExecutionResult {
        self.run(&request.code, request.tests.as_ref(), request.timeout)
            .await
    }

    /// Run a submission and report the stage it ended in
    #[instrument(skip(self, source, tests), fields(runtime = self.runtime.name(), len = source.len()))]
    pub async fn run_report(
        &self,
        source: &str,
        tests: Option<&TestSpec>,
        timeout: Option<f64>,
    ) -> RunReport {
        let started = Instant::now();

        let verdict = self.validate(source);
        if !verdict.accepted {
            let reason = verdict.reason.unwrap_or_default();
            info!(%reason, "submission rejected");
            return RunReport {
                stage: Stage::Rejected,
                result: ExecutionResult::failure(reason),
            };
        }

        let harness = match compose(self.runtime.as_ref(), &self.config.policy, source, tests) {
            Ok(harness) => harness,
            Err(e) => return runner_failure(e),
        };

        let options = ExecuteOptions {
            timeout: self.config.effective_timeout(timeout),
            diagnostic_limit: self.config.diagnostic_limit,
            scratch_dir: self.config.scratch_dir.clone(),
        };
        let raw = match execute(self.runtime.as_ref(), &harness, &options).await {
            Ok(raw) => raw,
            Err(e) => return runner_failure(e),
        };

        let (stage, result) = decode(raw, self.config.stdout_cap);
        info!(
            ?stage,
            ok = result.ok,
            tests = result.tests.len(),
            elapsed = ?started.elapsed(),
            "submission finished"
        );
        RunReport { stage, result }
    }
}

fn runner_failure(error: impl std::fmt::Display) -> RunReport {
    warn!(%error, "runner failed before the submission completed");
    RunReport {
        stage: Stage::RunnerError,
        result: ExecutionResult::failure(runner_error_message(&error.to_string())),
    }
}
