use labrun::Runner;
use labrun::types::{FunctionCase, TestOutcome, TestSpec};
use serde_json::json;

use super::{fixture_source, test_config};

fn add_spec() -> TestSpec {
    TestSpec::function("add")
        .with_case(FunctionCase::new([json!(2), json!(3)], json!(5)))
        .with_case(FunctionCase::new([json!(2), json!(2)], json!(5)))
}

#[tokio::test]
async fn test_function_cases_report_each_case() {
    let runner = Runner::new(test_config());
    let result = runner
        .run(&fixture_source("add.py"), Some(&add_spec()), None)
        .await;

    assert!(!result.ok);
    assert!(result.error.is_none());
    assert_eq!(result.tests.len(), 2);

    match &result.tests[0] {
        TestOutcome::Case {
            index,
            actual,
            passed,
            ..
        } => {
            assert_eq!(*index, 1);
            assert_eq!(actual, &Some(json!(5)));
            assert!(passed);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    match &result.tests[1] {
        TestOutcome::Case {
            index,
            actual,
            passed,
            ..
        } => {
            assert_eq!(*index, 2);
            assert_eq!(actual, &Some(json!(4)));
            assert!(!passed);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_function_cases_all_pass() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::function("add")
        .with_case(FunctionCase::new([json!(1), json!(1)], json!(2)))
        .with_case(FunctionCase::new([json!("a"), json!("b")], json!("ab")));
    let result = runner
        .run(&fixture_source("add.py"), Some(&tests), None)
        .await;

    assert!(result.ok, "{result:?}");
    assert!(result.tests.iter().all(TestOutcome::passed));
}

#[tokio::test]
async fn test_kwargs_and_case_errors() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::function("mean")
        .with_case(FunctionCase::new([json!([1, 2])], json!(1.5)))
        .with_case(FunctionCase::new([json!([1, 2])], json!(2.0)).with_kwarg("precision", json!(0)))
        .with_case(FunctionCase::new([json!([])], json!(0)));
    let result = runner
        .run(&fixture_source("stats.py"), Some(&tests), None)
        .await;

    assert!(!result.ok);
    assert_eq!(result.stdout, "mean ready\n");
    assert!(result.tests[0].passed());
    assert!(result.tests[1].passed());
    match &result.tests[2] {
        TestOutcome::Case {
            actual,
            error,
            passed,
            ..
        } => {
            assert!(actual.is_none());
            assert_eq!(error.as_deref(), Some("ZeroDivisionError: division by zero"));
            assert!(!passed);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_function() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::function("multiply")
        .with_case(FunctionCase::new([json!(2), json!(3)], json!(6)));
    let result = runner
        .run(&fixture_source("add.py"), Some(&tests), None)
        .await;

    assert!(!result.ok);
    assert_eq!(
        result.tests,
        vec![TestOutcome::MissingFunction {
            name: "multiply".to_string(),
            error: "Function not found or not callable.".to_string(),
            passed: false,
        }]
    );
}

#[tokio::test]
async fn test_non_callable_target_is_missing() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::function("add").with_case(FunctionCase::new(Vec::new(), json!(1)));
    let result = runner.run("add = 3", Some(&tests), None).await;

    assert!(!result.ok);
    assert!(matches!(
        result.tests.as_slice(),
        [TestOutcome::MissingFunction { .. }]
    ));
}

#[tokio::test]
async fn test_non_json_return_value_uses_repr() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::function("pair").with_case(FunctionCase::new(Vec::new(), json!([1, 2])));
    let result = runner
        .run("def pair():\n    return {1, 2}\n", Some(&tests), None)
        .await;

    assert!(!result.ok);
    match &result.tests[0] {
        TestOutcome::Case { actual, .. } => assert_eq!(actual, &Some(json!("{1, 2}"))),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_none_return_is_reported_as_null() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::function("f").with_case(FunctionCase::new(Vec::new(), json!(1)));
    let result = runner.run("def f():\n    pass\n", Some(&tests), None).await;

    assert!(!result.ok);
    assert!(result.error.is_none());
    match &result.tests[0] {
        TestOutcome::Case {
            actual,
            error,
            passed,
            ..
        } => {
            assert_eq!(actual, &Some(serde_json::Value::Null));
            assert!(error.is_none());
            assert!(!passed);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_non_finite_return_value_decodes() {
    let runner = Runner::new(test_config());
    let tests = TestSpec::function("f").with_case(FunctionCase::new(Vec::new(), json!(1)));
    let source = "def f():\n    return [float('inf'), float('nan'), 0.5]\n";
    let result = runner.run(source, Some(&tests), None).await;

    assert!(!result.ok);
    assert!(result.error.is_none(), "{result:?}");
    match &result.tests[0] {
        TestOutcome::Case { actual, passed, .. } => {
            assert_eq!(actual, &Some(json!(["inf", "nan", 0.5])));
            assert!(!passed);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}
