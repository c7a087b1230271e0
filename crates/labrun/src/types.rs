use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Marker appended to captured stdout when it exceeds the configured cap
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Automated checks run against a submission after it executes
///
/// Tagged by a `type` field so lesson pages can embed specs as
/// `{"type": "stdout_exact", "expected": "..."}` or
/// `{"type": "function", "name": "...", "cases": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestSpec {
    /// Compare trimmed stdout against the trimmed expected text
    StdoutExact { expected: String },

    /// Call a function defined by the submission once per case
    #[serde(rename = "function")]
    FunctionCases {
        name: String,
        #[serde(default)]
        cases: Vec<FunctionCase>,
    },
}

impl TestSpec {
    /// Create a stdout comparison spec
    pub fn stdout_exact(expected: impl Into<String>) -> Self {
        TestSpec::StdoutExact {
            expected: expected.into(),
        }
    }

    /// Create a function-call spec with no cases
    pub fn function(name: impl Into<String>) -> Self {
        TestSpec::FunctionCases {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Append a case to a function-call spec
    ///
    /// Has no effect on other spec kinds.
    pub fn with_case(mut self, case: FunctionCase) -> Self {
        if let TestSpec::FunctionCases { cases, .. } = &mut self {
            cases.push(case);
        }
        self
    }
}

/// A single call of the function under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCase {
    /// Positional arguments, in order
    #[serde(default)]
    pub args: Vec<Value>,

    /// Keyword arguments
    #[serde(default)]
    pub kwargs: Map<String, Value>,

    /// Expected return value, compared with `==`
    #[serde(default)]
    pub expect: Value,
}

impl FunctionCase {
    pub fn new(args: impl IntoIterator<Item = Value>, expect: Value) -> Self {
        Self {
            args: args.into_iter().collect(),
            kwargs: Map::new(),
            expect,
        }
    }

    /// Add a keyword argument
    pub fn with_kwarg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }
}

/// Outcome of evaluating a test spec, one entry per check performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestOutcome {
    /// Result of a stdout comparison
    StdoutExact {
        name: String,
        expected: String,
        actual: String,
        #[serde(rename = "pass")]
        passed: bool,
    },

    /// Result of one function-call case
    Case {
        /// 1-based position of the case in the spec
        index: usize,
        args: Vec<Value>,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        kwargs: Map<String, Value>,
        #[serde(default)]
        expect: Value,
        /// Return value, absent when the call raised. A `None` return is
        /// `Some(Value::Null)`.
        #[serde(
            default,
            deserialize_with = "present_value",
            skip_serializing_if = "Option::is_none"
        )]
        actual: Option<Value>,
        /// Failure raised by the call
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(rename = "pass")]
        passed: bool,
    },

    /// The named function was not defined or is not callable
    MissingFunction {
        name: String,
        error: String,
        #[serde(rename = "pass")]
        passed: bool,
    },

    /// No tests were requested
    Note {
        note: String,
        #[serde(rename = "pass", default = "default_true")]
        passed: bool,
    },
}

fn default_true() -> bool {
    true
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TestOutcome {
    /// Whether this check passed
    #[must_use]
    pub fn passed(&self) -> bool {
        match self {
            TestOutcome::StdoutExact { passed, .. }
            | TestOutcome::Case { passed, .. }
            | TestOutcome::MissingFunction { passed, .. }
            | TestOutcome::Note { passed, .. } => *passed,
        }
    }
}

/// Result of a static validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub accepted: bool,

    /// Why the source was rejected; present whenever `accepted` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationVerdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// The caller-facing verdict for a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// True only when the source was accepted, ran without error, and every
    /// requested test passed
    pub ok: bool,

    /// Captured standard output, capped
    #[serde(default)]
    pub stdout: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub tests: Vec<TestOutcome>,
}

impl ExecutionResult {
    /// A failed result carrying only an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            stdout: String::new(),
            error: Some(error.into()),
            tests: Vec::new(),
        }
    }

    /// Check whether every recorded test passed (vacuously true when empty)
    #[must_use]
    pub fn all_tests_passed(&self) -> bool {
        self.tests.iter().all(TestOutcome::passed)
    }
}

/// Where in the pipeline a failure was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Syntax error or forbidden construct; the code never ran
    Validation,
    /// The submission raised while executing
    Execution,
    /// A test case raised, or the target function was missing
    TestEvaluation,
    /// The wall-clock limit expired
    Timeout,
    /// The interpreter exited non-zero or could not be started
    Runner,
    /// The final output line was missing or malformed
    Decode,
}

/// Terminal state reached by a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rejected,
    TimedOut,
    Decoded,
    DecodeFailed,
    RunnerError,
}

impl Stage {
    /// The failure kind this stage implies, if the stage itself is a failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Stage::Rejected => Some(FailureKind::Validation),
            Stage::TimedOut => Some(FailureKind::Timeout),
            Stage::RunnerError => Some(FailureKind::Runner),
            Stage::DecodeFailed => Some(FailureKind::Decode),
            Stage::Decoded => None,
        }
    }
}

/// A submission as posted by a lesson page: `{"code": ..., "tests": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub code: String,

    #[serde(default)]
    pub tests: Option<TestSpec>,

    /// Wall-clock limit in seconds (config default when absent)
    #[serde(default)]
    pub timeout: Option<f64>,
}
