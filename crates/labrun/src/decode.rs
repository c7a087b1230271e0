//! Result decoding
//!
//! Turns a [`RawOutcome`] into the caller-facing [`ExecutionResult`]. Every
//! input decodes to a well-formed result; malformed harness output is a
//! failure result, never an error.

use tracing::debug;

use crate::sandbox::RawOutcome;
use crate::types::{ExecutionResult, Stage, TRUNCATION_MARKER};

/// Error reported when the final output line is not a valid record
pub const DECODE_FAILURE: &str = "Failed to decode runner output.";

/// Message for a run that exceeded its wall-clock limit
pub fn timeout_message(limit: f64) -> String {
    format!("Execution timed out (limit {limit}s).")
}

/// Message for an interpreter that failed outside the harness's control
pub fn runner_error_message(diagnostic: &str) -> String {
    format!("Runner error: {diagnostic}")
}

/// The first `max` characters of `text`
pub fn char_prefix(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Cap `stdout` at `cap` characters, appending the truncation marker if cut
pub fn truncate_stdout(stdout: &mut String, cap: usize) {
    if let Some((end, _)) = stdout.char_indices().nth(cap) {
        stdout.truncate(end);
        stdout.push_str(TRUNCATION_MARKER);
    }
}

/// Decode a raw executor outcome
pub fn decode(raw: RawOutcome, stdout_cap: usize) -> (Stage, ExecutionResult) {
    match raw {
        RawOutcome::TimedOut { limit } => (
            Stage::TimedOut,
            ExecutionResult::failure(timeout_message(limit)),
        ),
        RawOutcome::RunnerError { diagnostic } => (
            Stage::RunnerError,
            ExecutionResult::failure(runner_error_message(&diagnostic)),
        ),
        RawOutcome::Exited { stdout } => decode_record(stdout, stdout_cap),
    }
}

fn decode_record(stdout: String, stdout_cap: usize) -> (Stage, ExecutionResult) {
    let record = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<ExecutionResult>(line.trim()));

    let mut result = match record {
        Some(Ok(result)) => result,
        Some(Err(e)) => {
            debug!(error = %e, "harness record is malformed");
            return decode_failure(stdout);
        }
        None => {
            debug!("harness produced no output");
            return decode_failure(stdout);
        }
    };

    truncate_stdout(&mut result.stdout, stdout_cap);
    result.ok = result.ok && result.error.is_none() && result.all_tests_passed();
    (Stage::Decoded, result)
}

fn decode_failure(stdout: String) -> (Stage, ExecutionResult) {
    let mut result = ExecutionResult::failure(DECODE_FAILURE);
    result.stdout = stdout;
    (Stage::DecodeFailed, result)
}
