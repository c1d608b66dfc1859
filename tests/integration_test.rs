use std::io::Write;
use story_memory_node::config::LogFormat;
use story_memory_node::{Config, Error, StoryMemoryCredentials};

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.credentials.base_url, "https://jackskehan.tech/storyAPI");
    assert!(config.credentials.api_key.is_empty());
    assert_eq!(config.http.connect_timeout_secs, 10);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();

    // Valid config should pass
    assert!(config.validate().is_ok());

    // Empty base URL
    config.credentials.base_url = String::new();
    assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));

    // Relative base URL
    config.credentials.base_url = "storyAPI".to_string();
    assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
    config.credentials.base_url = "http://localhost:8000".to_string();

    // Zero timeout
    config.http.timeout_secs = 0;
    assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
    config.http.timeout_secs = 30;

    // Broken filter directive
    config.logging.level = "story_memory_node=[".to_string();
    assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[credentials]
api_key = "file-key"
base_url = "http://localhost:8001"

[execution]
continue_on_fail = true

[logging]
format = "json"
"#
    )
    .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.credentials.api_key, "file-key");
    assert_eq!(config.credentials.base_url, "http://localhost:8001");
    assert!(config.execution.continue_on_fail);
    assert_eq!(config.logging.format, LogFormat::Json);
    // untouched sections keep their defaults
    assert_eq!(config.logging.level, "info");

    let credentials = StoryMemoryCredentials::from_config(&config.credentials).unwrap();
    assert_eq!(credentials.base_url(), "http://localhost:8001");
}

#[test]
fn test_config_file_with_invalid_url_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[credentials]\nbase_url = \"not a url\"").unwrap();
    assert!(matches!(
        Config::load(Some(file.path())),
        Err(Error::InvalidInput { .. })
    ));
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(Config::load(Some(&missing)), Err(Error::Config(_))));
}

#[test]
fn test_environment_overrides_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[execution]\ncoalesce_requests = false").unwrap();

    std::env::set_var("STORY_MEMORY_EXECUTION__COALESCE_REQUESTS", "true");
    let config = Config::load(Some(file.path()));
    std::env::remove_var("STORY_MEMORY_EXECUTION__COALESCE_REQUESTS");

    assert!(config.unwrap().execution.coalesce_requests);
}

#[test]
fn test_error_chain() {
    let err = Error::InvalidInput {
        field: "childId".to_string(),
        reason: "expected a whole number".to_string(),
    };
    assert_eq!(format!("{}", err), "Invalid input: childId - expected a whole number");
}

#[test]
fn test_build_info() {
    let _version = env!("CARGO_PKG_VERSION");
    let _name = env!("CARGO_PKG_NAME");
}
