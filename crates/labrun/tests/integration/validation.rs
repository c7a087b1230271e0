use labrun::Runner;
use labrun::config::{ATTRIBUTE_REASON, IMPORT_REASON};
use labrun::types::Stage;

use super::{fixture_source, test_config};

#[tokio::test]
async fn test_import_is_rejected_before_running() {
    let runner = Runner::new(test_config());
    let report = runner
        .run_report(&fixture_source("escape_import.py"), None, None)
        .await;

    assert_eq!(report.stage, Stage::Rejected);
    assert!(!report.result.ok);
    assert!(report.result.error.as_deref().unwrap().contains("import"));
    assert_eq!(report.result.error.as_deref(), Some(IMPORT_REASON));
    assert!(report.result.stdout.is_empty());
    assert!(report.result.tests.is_empty());
}

#[tokio::test]
async fn test_dunder_walk_is_rejected() {
    let runner = Runner::new(test_config());
    let result = runner
        .run(&fixture_source("escape_dunder.py"), None, None)
        .await;

    assert!(!result.ok);
    assert_eq!(result.error.as_deref(), Some(ATTRIBUTE_REASON));
}

#[tokio::test]
async fn test_denied_name_is_rejected() {
    let runner = Runner::new(test_config());
    let result = runner
        .run("print(open('/etc/passwd').read())", None, None)
        .await;

    assert_eq!(
        result.error.as_deref(),
        Some("Use of 'open' is not allowed in this lab.")
    );
}

#[tokio::test]
async fn test_syntax_error_is_rejected() {
    let runner = Runner::new(test_config());
    let report = runner.run_report("print('unterminated", None, None).await;

    assert_eq!(report.stage, Stage::Rejected);
    assert!(report.result.error.unwrap().starts_with("SyntaxError: "));
}

#[tokio::test]
async fn test_unlisted_builtin_fails_at_run_time() {
    // `getattr` passes the static gate but is absent from the namespace
    let runner = Runner::new(test_config());
    let result = runner.run("print(getattr(1, 'real'))", None, None).await;

    assert!(!result.ok);
    assert_eq!(
        result.error.as_deref(),
        Some("NameError: name 'getattr' is not defined")
    );
}
