//! # Application Configuration
//!
//! Defines the configuration for `askdb-server` and loads it in layers:
//! programmatic defaults, an optional `config.yml` (with `${VAR}`
//! substitution), plain environment variables for top-level keys and
//! `ASKDB_`-prefixed variables for nested ones.

use askdb::constants::{DEFAULT_DB_FILE, DEFAULT_TABLE_PREFIX};
use askdb::providers::ai::{
    GenerationSettings, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use askdb::providers::factory::ProviderSettings;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs, sync::OnceLock, time::Duration};
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Overridden by `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Overridden by `DB_URL`.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// The prefix every application table carries.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Whether `/chat` responses carry a base64 CSV of the rows.
    #[serde(default = "default_csv_export")]
    pub csv_export: bool,
    /// The completion provider settings.
    pub llm: LlmConfig,
}

fn default_port() -> u16 {
    9090
}

fn default_db_url() -> String {
    DEFAULT_DB_FILE.to_string()
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

fn default_csv_export() -> bool {
    true
}

/// The completion provider settings. Read-only to the pipeline.
#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    /// `openai` (or any OpenAI-compatible server) or `gemini`.
    pub provider: String,
    /// Optional; derived from the provider and model when absent.
    #[serde(default)]
    pub api_url: Option<String>,
    /// May be absent: requests then fail with a configuration error.
    #[serde(default)]
    pub provider_api_key: Option<String>,
    pub model_name: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("has_api_key", &self.provider_api_key.is_some())
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    pub fn to_settings(&self) -> ProviderSettings {
        ProviderSettings {
            provider: self.provider.clone(),
            api_url: self.api_url.clone().filter(|url| !url.trim().is_empty()),
            provider_api_key: self.provider_api_key.clone(),
            model_name: self.model_name.clone(),
            generation: GenerationSettings {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                timeout: Duration::from_secs(self.timeout_secs),
            },
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").expect("placeholder regex is valid"))
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let expanded_content = placeholder_regex().replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration.
///
/// An explicit `config_path_override` must exist. Without one, `config.yml`
/// next to the server manifest is used when present.
/// - Top-level keys like `port` and `db_url` are overridden by `PORT` and `DB_URL`.
/// - Nested keys are overridden by `ASKDB_...` variables (e.g. `ASKDB_LLM__MODEL_NAME`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults for the provider block.
        .set_default("llm.provider", "openai")?
        .set_default("llm.model_name", "gpt-4o-mini")?
        .set_default("llm.temperature", f64::from(DEFAULT_TEMPERATURE))?
        .set_default("llm.max_output_tokens", i64::from(DEFAULT_MAX_OUTPUT_TOKENS))?
        .set_default("llm.timeout_secs", DEFAULT_TIMEOUT_SECS)?;

    // Layer 2: The YAML file.
    let main_content = match config_path_override {
        Some(path) => Some(read_and_substitute(path)?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{path}'."))
        })?),
        None => {
            let user_config_path = format!("{}/config.yml", env!("CARGO_MANIFEST_DIR"));
            let content = read_and_substitute(&user_config_path)?;
            if content.is_some() {
                info!("Loading configuration from '{user_config_path}'.");
            } else {
                info!("'{user_config_path}' not found; using defaults and environment.");
            }
            content
        }
    };
    if let Some(content) = main_content {
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Layer 3: Load environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Layer 4: Load prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("ASKDB")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
