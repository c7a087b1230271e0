use labrun::Runner;
use labrun::types::{Stage, TRUNCATION_MARKER, TestOutcome, TestSpec};

use super::{fixture_source, test_config};

#[tokio::test]
async fn test_run_hello_without_tests() {
    let runner = Runner::new(test_config());
    let report = runner
        .run_report(&fixture_source("hello.py"), None, None)
        .await;

    assert_eq!(report.stage, Stage::Decoded);
    assert!(report.result.ok);
    assert_eq!(report.result.stdout, "hello\n");
    assert!(report.result.error.is_none());
    assert_eq!(
        report.result.tests,
        vec![TestOutcome::Note {
            note: "No tests run".to_string(),
            passed: true,
        }]
    );
}

#[tokio::test]
async fn test_stdout_exact_passes_after_trimming() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::stdout_exact("  hello  \n");
    let result = runner
        .run(&fixture_source("hello.py"), Some(&tests), None)
        .await;

    assert!(result.ok);
    match &result.tests[..] {
        [TestOutcome::StdoutExact {
            expected,
            actual,
            passed,
            ..
        }] => {
            assert_eq!(expected, "hello");
            assert_eq!(actual, "hello");
            assert!(passed);
        }
        other => panic!("unexpected outcomes {other:?}"),
    }
}

#[tokio::test]
async fn test_stdout_exact_mismatch_fails() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::stdout_exact("goodbye");
    let result = runner
        .run(&fixture_source("hello.py"), Some(&tests), None)
        .await;

    assert!(!result.ok);
    assert!(result.error.is_none());
    assert!(!result.tests[0].passed());
}

#[tokio::test]
async fn test_runtime_error_keeps_partial_stdout() {
    let runner = Runner::new(test_config());
    let result = runner
        .run(&fixture_source("raises.py"), None, None)
        .await;

    assert!(!result.ok);
    assert_eq!(result.stdout, "before\n");
    assert_eq!(
        result.error.as_deref(),
        Some("ZeroDivisionError: division by zero")
    );
}

#[tokio::test]
async fn test_long_stdout_is_truncated() {
    let runner = Runner::new(test_config());
    let result = runner
        .run(&fixture_source("big_output.py"), None, None)
        .await;

    assert!(result.ok);
    assert_eq!(
        result.stdout.chars().count(),
        6000 + TRUNCATION_MARKER.chars().count()
    );
    assert!(result.stdout.ends_with(TRUNCATION_MARKER));
    assert!(result.stdout.starts_with("line 0\n"));
}

#[tokio::test]
async fn test_non_ascii_output_round_trips() {
    let runner = Runner::new(test_config());
    let result = runner.run("print('héllo, 世界')", None, None).await;

    assert!(result.ok);
    assert_eq!(result.stdout, "héllo, 世界\n");
}

#[tokio::test]
async fn test_submission_with_triple_quotes_runs_verbatim() {
    let runner = Runner::new(test_config());
    let source = "s = \"\"\"a \\\"\"\" b\"\"\"\nprint(s)\nt = r'\\n'\nprint(len(t))\n";
    let result = runner.run(source, None, None).await;

    assert!(result.ok, "{result:?}");
    assert_eq!(result.stdout, "a \"\"\" b\n2\n");
}
