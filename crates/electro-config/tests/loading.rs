//! Layered loading: preset, then file, then environment.

use std::io::Write;

use electro_config::{ConfigError, ConfigLoader, LogFormat};

fn toml_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn file_then_environment() {
    let file = toml_file(
        r#"
        [app]
        name = "catalog"

        [logging]
        level = "warn"
        format = "pretty"

        [dispatch]
        request_timeout_ms = 2000
        "#,
    );

    std::env::set_var("ELECTRO_LAYER_IT__DISPATCH__REQUEST_TIMEOUT_MS", "750");
    std::env::set_var("ELECTRO_LAYER_IT__SESSION__ENABLED", "false");

    let config = ConfigLoader::new()
        .with_development()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("electro_layer_it")
        .load()
        .unwrap();

    assert_eq!(config.app.name, "catalog");
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.dispatch.request_timeout_ms, 750);
    assert!(!config.session.enabled);
}

#[test]
fn prefix_requires_separator() {
    std::env::set_var("ELECTRO_SEP_ITX__APP__NAME", "wrong");

    let config = ConfigLoader::new()
        .with_env_prefix("ELECTRO_SEP_IT")
        .load()
        .unwrap();

    assert_eq!(config.app.name, "electro-app");
}

#[test]
fn json_file_with_unknown_field_fails() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br#"{"dispatch": {"request_timeout_ms": 10, "retries": 2}}"#)
        .unwrap();

    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::JsonError(_)));
}

#[test]
fn bad_environment_value_fails_load() {
    std::env::set_var("ELECTRO_BAD_IT__DISPATCH__TRACE_ROUTING", "sometimes");

    let err = ConfigLoader::new()
        .with_env_prefix("ELECTRO_BAD_IT")
        .load()
        .unwrap_err();

    assert!(err.to_string().contains("ELECTRO_BAD_IT__DISPATCH__TRACE_ROUTING"));
}
