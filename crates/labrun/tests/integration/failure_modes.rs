use std::time::{Duration, Instant};

use labrun::Runner;
use labrun::config::Config;
use labrun::types::{FailureKind, RunRequest, Stage};

use super::{fixture_source, test_config};

#[tokio::test]
async fn test_infinite_loop_times_out() {
    let runner = Runner::new(test_config());
    let started = Instant::now();
    let report = runner
        .run_report(&fixture_source("infinite_loop.py"), None, Some(1.0))
        .await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(report.stage, Stage::TimedOut);
    assert_eq!(
        report.result.error.as_deref(),
        Some("Execution timed out (limit 1s).")
    );
    assert!(report.result.stdout.is_empty());
    assert_eq!(report.failure_kind(), Some(FailureKind::Timeout));
}

#[tokio::test]
async fn test_slow_and_fast_runs_resolve_independently() {
    let runner = Runner::new(test_config());

    let slow_runner = runner.clone();
    let slow = tokio::spawn(async move {
        slow_runner
            .run(&fixture_source("infinite_loop.py"), None, Some(2.0))
            .await
    });

    let started = Instant::now();
    let fast = runner.run(&fixture_source("hello.py"), None, None).await;
    assert!(fast.ok);
    assert!(started.elapsed() < Duration::from_secs(2));

    let slow = slow.await.unwrap();
    assert_eq!(
        slow.error.as_deref(),
        Some("Execution timed out (limit 2s).")
    );
}

#[tokio::test]
async fn test_many_concurrent_runs() {
    let runner = Runner::new(test_config());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run(&format!("print({i} * 2)"), None, None).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        assert!(result.ok);
        assert_eq!(result.stdout, format!("{}\n", i * 2));
    }
}

#[tokio::test]
async fn test_undefined_name_is_an_execution_error() {
    let runner = Runner::new(test_config());
    let report = runner.run_report("print(undefined_name)", None, None).await;

    assert_eq!(report.stage, Stage::Decoded);
    assert_eq!(
        report.result.error.as_deref(),
        Some("NameError: name 'undefined_name' is not defined")
    );
    assert_eq!(report.failure_kind(), Some(FailureKind::Execution));
}

#[tokio::test]
async fn test_missing_interpreter_is_runner_error() {
    let mut config = Config::default();
    config.python_path = "labrun-missing-python".into();
    let runner = Runner::new(config);
    let report = runner.run_report("print(1)", None, None).await;

    assert_eq!(report.stage, Stage::RunnerError);
    assert!(report.result.error.unwrap().starts_with("Runner error: "));
}

#[tokio::test]
async fn test_interpreter_crash_is_runner_error() {
    // An unknown flag makes the interpreter exit non-zero before the harness runs
    let mut config = test_config();
    config.interpreter_flags = vec!["--labrun-unknown-flag".to_string()];
    let runner = Runner::new(config);
    let report = runner.run_report("print(1)", None, None).await;

    assert_eq!(report.stage, Stage::RunnerError);
    assert!(report.result.error.unwrap().starts_with("Runner error: "));
    assert_eq!(report.failure_kind(), Some(FailureKind::Runner));
}

#[tokio::test]
async fn test_scratch_dir_is_left_empty() {
    let scratch = tempfile::TempDir::new().unwrap();
    let mut config = test_config();
    config.scratch_dir = Some(scratch.path().to_path_buf());
    let runner = Runner::new(config);

    runner.run(&fixture_source("hello.py"), None, None).await;
    runner
        .run(&fixture_source("infinite_loop.py"), None, Some(0.5))
        .await;

    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_run_request_json() {
    let request: RunRequest = serde_json::from_value(serde_json::json!({
        "code": "def add(a, b):\n    return a + b\n",
        "tests": {"type": "function", "name": "add", "cases": [{"args": [2, 3], "expect": 5}]}
    }))
    .unwrap();

    let runner = Runner::new(test_config());
    let result = runner.run_request(&request).await;
    assert!(result.ok, "{result:?}");

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["tests"][0]["kind"], "case");
    assert_eq!(value["tests"][0]["pass"], true);
    assert!(value.get("error").is_none());
}
