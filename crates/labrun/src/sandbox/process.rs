//! Process spawning and output capture
//!
//! Handles running the harness under the interpreter and enforcing the
//! wall-clock limit.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::decode::char_prefix;
use crate::harness::Harness;
use crate::runtime::ScriptRuntime;
use crate::sandbox::command::SandboxCommand;
use crate::sandbox::workspace::Workspace;
use crate::sandbox::{RawOutcome, SandboxError, resolve_program};

/// Limits and placement for one execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Wall-clock limit in seconds
    pub timeout: f64,

    /// Maximum characters of diagnostic kept from a failed run
    pub diagnostic_limit: usize,

    /// Parent directory for the workspace (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
}

/// Run a harness bundle in a fresh workspace
///
/// The workspace is removed and the child is reaped before this returns.
/// Setup failures are reported as errors; anything the child does is
/// reported as a [`RawOutcome`].
#[instrument(skip(runtime, harness, options), fields(runtime = runtime.name(), timeout = options.timeout))]
pub async fn execute(
    runtime: &dyn ScriptRuntime,
    harness: &Harness,
    options: &ExecuteOptions,
) -> Result<RawOutcome, SandboxError> {
    let limit = Duration::try_from_secs_f64(options.timeout)
        .map_err(|_| SandboxError::InvalidTimeout(options.timeout))?;

    let workspace = Workspace::create(options.scratch_dir.as_deref())?;
    for file in harness.files() {
        workspace
            .write_file(&file.name, file.content.as_bytes())
            .await?;
    }

    let invocation = runtime.invocation(
        Path::new(&harness.program.name),
        Path::new(&harness.submission.name),
        Path::new(&harness.manifest.name),
    );
    let program = resolve_program(&invocation.program)?;
    let command = SandboxCommand::from_invocation(invocation)
        .program(program)
        .working_dir(workspace.path());

    debug!(
        program = ?command.program_path(),
        args = ?command.arguments(),
        "spawning interpreter"
    );

    let started = Instant::now();
    let mut child = command
        .build()
        .spawn()
        .map_err(SandboxError::SpawnFailed)?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let waited = tokio::time::timeout(limit, child.wait()).await;
    let status = match waited {
        Ok(status) => status?,
        Err(_) => {
            // kill() also reaps the child
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed out interpreter");
            }
            stdout.abort();
            stderr.abort();
            warn!(elapsed = ?started.elapsed(), "execution timed out");
            return Ok(RawOutcome::TimedOut {
                limit: options.timeout,
            });
        }
    };

    let stdout = join_reader(stdout).await?;
    let stderr = join_reader(stderr).await?;

    debug!(
        ?status,
        elapsed = ?started.elapsed(),
        stdout_len = stdout.len(),
        stderr_len = stderr.len(),
        "interpreter exited"
    );

    if !status.success() {
        let diagnostic = match stderr.trim() {
            "" => stdout.trim(),
            stderr => stderr,
        };
        return Ok(RawOutcome::RunnerError {
            diagnostic: char_prefix(diagnostic, options.diagnostic_limit).to_string(),
        });
    }

    Ok(RawOutcome::Exited { stdout })
}

/// Drain a child pipe on its own task so neither pipe can fill and block
fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn join_reader(
    handle: JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<String, SandboxError> {
    let bytes = handle
        .await
        .map_err(|e| SandboxError::ReaderFailed(e.to_string()))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
