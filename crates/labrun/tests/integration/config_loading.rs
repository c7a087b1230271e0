use std::path::PathBuf;

use labrun::config::{Config, ConfigError};

use super::FIXTURES_PATH;

#[test]
fn test_load_valid_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_full.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.python_path, PathBuf::from("python3"));
    assert_eq!(config.timeout, 2.0);
    assert_eq!(config.stdout_cap, 100);
    assert_eq!(config.diagnostic_limit, 200);
    assert_eq!(config.policy.allowed_builtins.len(), 5);
    assert!(config.policy.is_denied_attribute("__dict__"));
    assert!(!config.policy.is_denied_name("subprocess"));
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_minimal.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.timeout, 1.5);
    assert_eq!(config.interpreter_flags, vec!["-I", "-B", "-S"]);
    assert_eq!(config.policy, labrun::Policy::default());
}

#[test]
fn test_load_invalid_timeout() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_timeout.toml");
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_policy() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_policy.toml");
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_forbidden_builtin_with_trimmed_deny_list() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_forbidden_builtin.toml");
    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("'open'"));
}

#[test]
fn test_load_invalid_empty_python() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_empty_python.toml");
    let result = Config::from_file(&path);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_restricted_builtins_from_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_full.toml");
    let config = Config::from_file(&path).expect("Failed to load config");
    let runner = labrun::Runner::new(config);

    // `str` is not among the configured builtins
    let result = runner.run("print(str(1))", None, None).await;
    assert!(!result.ok);
    assert_eq!(
        result.error.as_deref(),
        Some("NameError: name 'str' is not defined")
    );
}
