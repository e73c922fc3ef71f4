//! Configuration loading for the clarification services
//!
//! TOML config file with environment-variable overrides. Resolution
//! priority for secrets is ENV -> TOML, with a warning when a value is
//! present in more than one source.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the reasoning service API key
pub const API_KEY_ENV: &str = "CLARIFY_API_KEY";
/// Environment variable overriding the reasoning model name
pub const MODEL_ENV: &str = "CLARIFY_MODEL";
/// Environment variable overriding the reasoning service base URL
pub const API_BASE_ENV: &str = "CLARIFY_API_BASE";

/// Reasoning service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Model identifier sent to the reasoning service
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature (low for consistency)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            api_base: default_api_base(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Reasoning service API key (ENV takes priority)
    pub api_key: Option<String>,
    /// Path to the shared SQLite database
    pub database_path: Option<PathBuf>,
    /// Reasoning service settings
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

impl TomlConfig {
    /// Load configuration from an explicit path, or the platform default
    ///
    /// A missing file yields defaults; a malformed file is a hard error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Read config failed ({}): {}", path.display(), e))
                })?;
                let config: TomlConfig = toml::from_str(&content).map_err(|e| {
                    Error::Config(format!("Parse config failed ({}): {}", path.display(), e))
                })?;
                info!("Configuration loaded from {}", path.display());
                config
            }
            Some(path) => {
                info!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply non-secret environment overrides (model, API base)
    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.trim().is_empty() {
                self.reasoning.model = model;
            }
        }
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                self.reasoning.api_base = base;
            }
        }
    }
}

/// Default configuration file path: `<config dir>/clarify/clarify.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("clarify").join("clarify.toml"))
}

/// Resolve the reasoning service API key
///
/// Priority: environment variable, then TOML config. Warns when the key
/// appears in both sources.
pub fn resolve_api_key(config: &TomlConfig) -> Result<String> {
    let mut sources = Vec::new();

    let env_key = std::env::var(API_KEY_ENV).ok();
    if let Some(key) = &env_key {
        if is_valid_key(key) {
            sources.push("environment");
        }
    }

    let toml_key = config.api_key.as_ref();
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            sources.push("TOML");
        }
    }

    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using environment (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("Reasoning API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("Reasoning API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    Err(Error::Config(format!(
        "Reasoning API key not configured. Set {} or add api_key to the config file.",
        API_KEY_ENV
    )))
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.reasoning.model, "gpt-4o");
        assert_eq!(config.reasoning.temperature, 0.1);
        assert_eq!(config.reasoning.request_timeout_secs, 60);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
            api_key = "sk-test"
            database_path = "/tmp/clarify.db"

            [reasoning]
            model = "gpt-4-turbo"
            temperature = 0.2
            api_base = "http://localhost:8080/v1"
            request_timeout_secs = 30
        "#;
        let config: TomlConfig = toml::from_str(content).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.reasoning.model, "gpt-4-turbo");
        assert_eq!(config.reasoning.api_base, "http://localhost:8080/v1");
        assert_eq!(config.reasoning.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: TomlConfig = toml::from_str("api_key = \"k\"").unwrap();
        assert_eq!(config.reasoning.model, "gpt-4o");
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    #[serial]
    fn test_missing_file_yields_defaults() {
        std::env::remove_var(MODEL_ENV);
        std::env::remove_var(API_BASE_ENV);
        let config = TomlConfig::load(Some(Path::new("/nonexistent/clarify.toml"))).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clarify.toml");
        std::fs::write(&path, "api_key = [not toml").unwrap();
        assert!(TomlConfig::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_env_key_wins_over_toml() {
        std::env::set_var(API_KEY_ENV, "sk-env");
        let config = TomlConfig {
            api_key: Some("sk-toml".to_string()),
            ..Default::default()
        };
        // Both sources set: environment takes priority (and warns)
        let key = resolve_api_key(&config);
        std::env::remove_var(API_KEY_ENV);
        assert_eq!(key.unwrap(), "sk-env");
    }

    #[test]
    #[serial]
    fn test_toml_key_used_when_env_absent() {
        std::env::remove_var(API_KEY_ENV);
        let config = TomlConfig {
            api_key: Some("sk-toml".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&config).unwrap(), "sk-toml");
        assert!(resolve_api_key(&TomlConfig::default()).is_err());
    }

    #[test]
    #[serial]
    fn test_blank_env_key_falls_through_to_toml() {
        std::env::set_var(API_KEY_ENV, "   ");
        let config = TomlConfig {
            api_key: Some("sk-toml".to_string()),
            ..Default::default()
        };
        let key = resolve_api_key(&config);
        std::env::remove_var(API_KEY_ENV);
        assert_eq!(key.unwrap(), "sk-toml");
    }

    #[test]
    #[serial]
    fn test_env_model_and_base_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clarify.toml");
        std::fs::write(
            &path,
            "[reasoning]\nmodel = \"gpt-4-turbo\"\napi_base = \"http://file.example/v1\"\n",
        )
        .unwrap();

        std::env::set_var(MODEL_ENV, "gpt-4o-mini");
        std::env::set_var(API_BASE_ENV, "http://localhost:9999/v1");
        let config = TomlConfig::load(Some(&path)).unwrap();
        std::env::remove_var(MODEL_ENV);
        std::env::remove_var(API_BASE_ENV);

        assert_eq!(config.reasoning.model, "gpt-4o-mini");
        assert_eq!(config.reasoning.api_base, "http://localhost:9999/v1");
    }

    #[test]
    #[serial]
    fn test_blank_env_overrides_ignored() {
        std::env::set_var(MODEL_ENV, "  ");
        std::env::remove_var(API_BASE_ENV);
        let config = TomlConfig::load(Some(Path::new("/nonexistent/clarify.toml"))).unwrap();
        std::env::remove_var(MODEL_ENV);
        assert_eq!(config.reasoning.model, "gpt-4o");
    }
}
