//! Integration tests for configuration loading and validation

use duochat_core::config::{
    load_from_json, load_from_yaml, ConfigError, ProviderType, SafeLogging, ValidationErrorKind,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_valid_yaml_config() {
    env::set_var("DUOCHAT_TEST_YAML_KEY", "yaml-secret");

    let yaml = r#"
version: "0.1"
providers:
  - name: Gemini
    type: gemini
    api_key: ${DUOCHAT_TEST_YAML_KEY}
  - name: OpenAI
    type: openai
    api_key_env: DUOCHAT_TEST_YAML_UNSET
    model: gpt-4o-mini
retry:
  max_attempts: 2
  base_delay_ms: 500
speech:
  enabled: false
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    let config = load_from_yaml(path).unwrap();
    assert_eq!(config.providers.len(), 2);
    assert_eq!(
        config.providers[0].credential().map(|k| k.expose_secret()),
        Some("yaml-secret")
    );
    // An unset api_key_env leaves the provider unconfigured, not invalid
    assert!(config.providers[1].credential().is_none());
    assert_eq!(config.providers[1].model(), "gpt-4o-mini");
    assert_eq!(config.retry.max_attempts, 2);
    assert!(!config.speech.enabled);

    env::remove_var("DUOCHAT_TEST_YAML_KEY");
}

#[test]
fn test_load_valid_json_config() {
    env::set_var("DUOCHAT_TEST_JSON_KEY", "json-secret");

    let json = r#"{
  "version": "0.1",
  "providers": [
    {
      "name": "OpenAI",
      "type": "openai",
      "api_key_env": "DUOCHAT_TEST_JSON_KEY",
      "base_url": "https://proxy.example.com/v1/"
    }
  ]
}"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.json", json);

    let config = load_from_json(path).unwrap();
    let provider = &config.providers[0];
    assert_eq!(provider.provider_type, ProviderType::OpenAI);
    assert_eq!(provider.base_url(), "https://proxy.example.com/v1");
    assert_eq!(
        provider.credential().map(|k| k.expose_secret()),
        Some("json-secret")
    );
    assert!(!provider.safe_for_logging().contains("json-secret"));
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.base_delay_ms, 1000);

    env::remove_var("DUOCHAT_TEST_JSON_KEY");
}

#[test]
fn test_omitted_providers_use_default_chain() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", "version: \"0.1\"\n");

    let config = load_from_yaml(path).unwrap();
    let order: Vec<_> = config.enabled_providers().map(|p| p.provider_type).collect();
    assert_eq!(order, vec![ProviderType::Gemini, ProviderType::OpenAI]);
}

#[test]
fn test_missing_interpolated_variable() {
    let yaml = r#"
version: "0.1"
providers:
  - name: Gemini
    type: gemini
    api_key: ${DUOCHAT_TEST_NEVER_SET}
"#;
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "DUOCHAT_TEST_NEVER_SET"),
        other => panic!("expected EnvVarNotFound, got {:?}", other),
    }
}

#[test]
fn test_commented_out_key_does_not_fail_load() {
    let yaml = r#"
version: "0.1"
providers:
  - name: Gemini
    type: gemini
    # api_key: ${DUOCHAT_TEST_COMMENTED_KEY}
    api_key_env: DUOCHAT_TEST_COMMENTED_KEY
"#;
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    let config = load_from_yaml(path).unwrap();
    assert!(config.providers[0].credential().is_none());
}

#[test]
fn test_invalid_version() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", "version: \"2.0\"\n");

    match load_from_yaml(path) {
        Err(ConfigError::ValidationError(e)) => {
            assert_eq!(e.field_path, "version");
            assert!(matches!(e.kind, ValidationErrorKind::InvalidVersion { .. }));
        }
        other => panic!("expected version error, got {:?}", other),
    }
}

#[test]
fn test_duplicate_provider_names() {
    let yaml = r#"
version: "0.1"
providers:
  - name: Primary
    type: gemini
  - name: Primary
    type: openai
"#;
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::ValidationError(e)) => {
            assert_eq!(e.field_path, "providers[1].name");
        }
        other => panic!("expected duplicate name error, got {:?}", other),
    }
}

#[test]
fn test_retry_bounds() {
    let yaml = r#"
version: "0.1"
retry:
  max_attempts: 0
"#;
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    assert!(matches!(
        load_from_yaml(path),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_all_providers_disabled() {
    let yaml = r#"
version: "0.1"
providers:
  - name: Gemini
    type: gemini
    enabled: false
"#;
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    assert!(load_from_yaml(path).is_err());
}

#[test]
fn test_parse_error_location() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.json", "{ \"version\": ");

    match load_from_json(path) {
        Err(ConfigError::ParseError { line, .. }) => assert_eq!(line, Some(1)),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        load_from_yaml("/nonexistent/duochat.yaml"),
        Err(ConfigError::IoError { .. })
    ));
}
