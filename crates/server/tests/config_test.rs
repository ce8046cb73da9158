//! # Configuration Tests
//!
//! Covers the layering of `get_config`: defaults, the YAML file with
//! `${VAR}` substitution, plain environment overrides and `ASKDB_` overrides.
//! Tests touching the process environment are serialised.

use askdb_server::config::{get_config, ConfigError};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::{tempdir, TempDir};

const ENV_VARS: &[&str] = &[
    "PORT",
    "DB_URL",
    "TABLE_PREFIX",
    "CSV_EXPORT",
    "ASKDB_LLM__MODEL_NAME",
    "ASKDB_LLM__PROVIDER",
    "ASKDB_PORT",
    "ASKDB_TEST_KEY",
];

/// A helper function to clear all environment variables used by the tests.
fn clear_env_vars() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn write_config(content: &str) -> (TempDir, String) {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("config.yml");
    fs::write(&path, content).expect("write config");
    let path = path.to_str().unwrap().to_string();
    (dir, path)
}

#[test]
#[serial]
fn test_defaults_fill_missing_fields() {
    clear_env_vars();
    let (_dir, path) = write_config("llm:\n  provider: \"openai\"\n");

    let config = get_config(Some(&path)).expect("Configuration should load successfully");

    assert_eq!(config.port, 9090);
    assert_eq!(config.db_url, "db/askdb.db");
    assert_eq!(config.table_prefix, "wp_");
    assert!(config.csv_export);
    assert_eq!(config.llm.model_name, "gpt-4o-mini");
    assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(config.llm.max_output_tokens, 2000);
    assert_eq!(config.llm.timeout_secs, 60);
    assert!(config.llm.provider_api_key.is_none());
}

#[test]
#[serial]
fn test_yaml_values_and_substitution() {
    clear_env_vars();
    env::set_var("ASKDB_TEST_KEY", "sk-from-env");
    let (_dir, path) = write_config(
        r#"
port: 8081
table_prefix: "site_"
csv_export: false
llm:
  provider: "gemini"
  provider_api_key: "${ASKDB_TEST_KEY}"
  model_name: "gemini-2.0-flash"
  temperature: 0.1
"#,
    );

    let config = get_config(Some(&path)).unwrap();

    assert_eq!(config.port, 8081);
    assert_eq!(config.table_prefix, "site_");
    assert!(!config.csv_export);
    assert_eq!(config.llm.provider, "gemini");
    assert_eq!(config.llm.provider_api_key.as_deref(), Some("sk-from-env"));
    assert_eq!(config.llm.model_name, "gemini-2.0-flash");

    let settings = config.llm.to_settings();
    assert!(settings.api_url.is_none());
    assert_eq!(settings.generation.timeout.as_secs(), 60);
    clear_env_vars();
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env_vars();
    let (_dir, path) = write_config("port: 8081\nllm:\n  model_name: \"from-file\"\n");
    env::set_var("PORT", "9999");
    env::set_var("DB_URL", "/tmp/override.db");
    env::set_var("ASKDB_LLM__MODEL_NAME", "from-env");

    let config = get_config(Some(&path)).unwrap();

    assert_eq!(config.port, 9999);
    assert_eq!(config.db_url, "/tmp/override.db");
    assert_eq!(config.llm.model_name, "from-env");
    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_override_file_is_not_found() {
    clear_env_vars();
    let result = get_config(Some("/definitely/not/here/config.yml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
#[serial]
fn test_debug_output_hides_api_key() {
    clear_env_vars();
    let (_dir, path) = write_config("llm:\n  provider_api_key: \"super-secret\"\n");

    let config = get_config(Some(&path)).unwrap();
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("has_api_key: true"));
}
