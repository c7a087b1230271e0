//! Harness composition
//!
//! A harness is the bundle handed to the executor: the runtime's constant
//! harness program, the submission as an opaque payload, and a JSON job
//! manifest naming the builtins to expose and the tests to run. The
//! submission is never spliced into program text.

use serde::Serialize;

use crate::config::Policy;
use crate::runtime::ScriptRuntime;
use crate::types::TestSpec;

/// File name stem of the harness program inside a workspace
pub const HARNESS_STEM: &str = "harness";

/// File name stem of the submission payload inside a workspace
pub const SUBMISSION_STEM: &str = "submission";

/// File name of the job manifest inside a workspace
pub const MANIFEST_FILE: &str = "job.json";

/// Job manifest read by the harness program
#[derive(Debug, Serialize)]
struct Manifest<'a> {
    allowed: &'a [String],
    tests: Option<&'a TestSpec>,
}

/// A file to be written into the execution workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessFile {
    pub name: String,
    pub content: String,
}

/// A self-contained harness bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harness {
    pub program: HarnessFile,
    pub submission: HarnessFile,
    pub manifest: HarnessFile,
}

impl Harness {
    /// All bundle files, in the order they are written
    pub fn files(&self) -> [&HarnessFile; 3] {
        [&self.program, &self.submission, &self.manifest]
    }
}

/// Build the harness bundle for an accepted submission
pub fn compose(
    runtime: &dyn ScriptRuntime,
    policy: &Policy,
    source: &str,
    tests: Option<&TestSpec>,
) -> Result<Harness, serde_json::Error> {
    let manifest = serde_json::to_string(&Manifest {
        allowed: &policy.allowed_builtins,
        tests,
    })?;

    let extension = runtime.extension();
    Ok(Harness {
        program: HarnessFile {
            name: format!("{HARNESS_STEM}.{extension}"),
            content: runtime.harness_program().to_string(),
        },
        submission: HarnessFile {
            name: format!("{SUBMISSION_STEM}.{extension}"),
            content: source.to_string(),
        },
        manifest: HarnessFile {
            name: MANIFEST_FILE.to_string(),
            content: manifest,
        },
    })
}
