//! labrun CLI
//!
//! A command-line tool for checking and running learner Python submissions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use labrun::{Config, EXAMPLE_CONFIG, ExecutionResult, RunRequest, Runner, TestOutcome, TestSpec};
use tokio::io::AsyncReadExt;
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "labrun")]
#[command(about = "A tool for validating and running learner submissions in a sandbox")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: labrun.toml)
        #[arg(short, long, default_value = "labrun.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Statically check a submission without running it
    Check {
        /// Source file to check
        #[arg(value_name = "FILE")]
        source: PathBuf,
    },

    /// Validate, run and test a submission
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Test specification as JSON
        #[arg(short, long, value_name = "FILE")]
        tests: Option<PathBuf>,

        /// Wall-clock limit in seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a JSON request of the form {"code": ..., "tests": ...}
    Request {
        /// Request file (default: stdin)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Show the active configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // Logs go to stderr so stdout stays clean for piping
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Check { source } => run_check(config, &source).await,
        Commands::Run {
            source,
            tests,
            timeout,
            json,
        } => run_submission(config, &source, tests.as_deref(), timeout, json).await,
        Commands::Request { input } => run_request(config, input.as_deref()).await,
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_check(config: Config, source: &Path) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let runner = Runner::new(config);
    let verdict = runner.validate(&code);

    match verdict.reason {
        None => {
            println!("Accepted");
            Ok(())
        }
        Some(reason) => {
            println!("Rejected: {reason}");
            std::process::exit(1);
        }
    }
}

async fn run_submission(
    config: Config,
    source: &Path,
    tests: Option<&Path>,
    timeout: Option<f64>,
    json: bool,
) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let tests = match tests {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .context("failed to read test specification")?;
            let spec: TestSpec =
                serde_json::from_str(&content).context("invalid test specification")?;
            Some(spec)
        }
        None => None,
    };

    let runner = Runner::new(config);
    let report = runner.run_report(&code, tests.as_ref(), timeout).await;

    info!(
        stage = ?report.stage,
        failure = ?report.failure_kind(),
        "run complete"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report.result)?);
    } else {
        print_result(&report.result);
    }

    if report.result.ok {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

async fn run_request(config: Config, input: Option<&Path>) -> Result<()> {
    let content = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .context("failed to read request file")?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read request from stdin")?;
            buf
        }
    };

    let request: RunRequest = serde_json::from_str(&content).context("invalid run request")?;

    let runner = Runner::new(config);
    let result = runner.run_request(&request).await;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

fn print_result(result: &ExecutionResult) {
    print!("{}", result.stdout);
    if !result.stdout.is_empty() && !result.stdout.ends_with('\n') {
        println!();
    }

    for outcome in &result.tests {
        println!("{}", describe_outcome(outcome));
    }

    if let Some(error) = &result.error {
        eprintln!("error: {error}");
    }
    println!("{}", if result.ok { "OK" } else { "FAILED" });
}

fn describe_outcome(outcome: &TestOutcome) -> String {
    let mark = if outcome.passed() { "PASS" } else { "FAIL" };
    match outcome {
        TestOutcome::StdoutExact {
            expected, actual, ..
        } => {
            if outcome.passed() {
                format!("{mark} stdout")
            } else {
                format!("{mark} stdout: expected {expected:?}, got {actual:?}")
            }
        }
        TestOutcome::Case {
            index,
            args,
            expect,
            actual,
            error,
            ..
        } => {
            let args = serde_json::Value::Array(args.clone());
            match (actual, error) {
                (_, Some(error)) => format!("{mark} case {index} {args}: {error}"),
                (Some(actual), None) => {
                    format!("{mark} case {index} {args}: expected {expect}, got {actual}")
                }
                (None, None) => format!("{mark} case {index} {args}"),
            }
        }
        TestOutcome::MissingFunction { name, error, .. } => format!("{mark} {name}: {error}"),
        TestOutcome::Note { note, .. } => format!("NOTE {note}"),
    }
}

fn show_config(config: &Config) {
    println!("Interpreter: {}", config.python_path.display());
    println!("  Flags: {}", config.interpreter_flags.join(" "));
    println!();
    println!("Timeout: {}s", config.timeout);
    println!("Stdout cap: {} chars", config.stdout_cap);
    println!("Diagnostic limit: {} chars", config.diagnostic_limit);
    match &config.scratch_dir {
        Some(dir) => println!("Scratch dir: {}", dir.display()),
        None => println!("Scratch dir: (system temp dir)"),
    }
    println!();

    let policy = &config.policy;
    println!("Allowed builtins: {}", policy.allowed_builtins.join(", "));
    println!(
        "Denied names: {}",
        policy
            .denied_names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Denied attributes: {} (and any name starting with __)",
        policy
            .denied_attributes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Dynamic evaluation: {}",
        policy
            .dynamic_eval
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
