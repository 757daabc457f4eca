//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// JSON-RPC endpoint of the central platform
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { url: default_server_url(), timeout_ms: default_timeout_ms() }
    }
}

fn default_server_url() -> String {
    "http://localhost:8080/jsonrpc".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the persisted session keys
    #[serde(default = "default_storage_file")]
    pub storage_file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { storage_file: default_storage_file() }
    }
}

fn default_storage_file() -> String {
    ".vc-console/session.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartsConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub default_refresh_interval_ms: u64,
    #[serde(default = "default_data_length")]
    pub default_data_length: usize,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            default_refresh_interval_ms: default_refresh_interval_ms(),
            default_data_length: default_data_length(),
        }
    }
}

fn default_refresh_interval_ms() -> u64 {
    15_000
}

fn default_data_length() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Exchanges kept by the exchange log
    #[serde(default = "default_max_exchanges")]
    pub max_exchanges: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { max_exchanges: default_max_exchanges() }
    }
}

fn default_max_exchanges() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    server_url: String,
    request_timeout_ms: u64,
    session_file: PathBuf,
    default_refresh_interval_ms: u64,
    default_data_length: usize,
    max_exchanges: usize,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            server_url: toml_config.server.url,
            request_timeout_ms: toml_config.server.timeout_ms,
            session_file: PathBuf::from(toml_config.session.storage_file),
            default_refresh_interval_ms: toml_config.charts.default_refresh_interval_ms,
            default_data_length: toml_config.charts.default_data_length,
            max_exchanges: toml_config.console.max_exchanges,
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(Self::resolve_config_path(args))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    pub fn default_refresh_interval_ms(&self) -> u64 {
        self.default_refresh_interval_ms
    }

    pub fn default_data_length(&self) -> usize {
        self.default_data_length
    }

    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    #[cfg(test)]
    pub fn with_max_exchanges(mut self, max: usize) -> Self {
        self.max_exchanges = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_url(), "http://localhost:8080/jsonrpc");
        assert_eq!(config.request_timeout_ms(), 60_000);
        assert_eq!(config.session_file(), Path::new(".vc-console/session.json"));
        assert_eq!(config.default_refresh_interval_ms(), 15_000);
        assert_eq!(config.default_data_length(), 20);
        assert_eq!(config.max_exchanges(), 100);
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_partial_toml_keeps_section_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[charts]
default_data_length = 50
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.default_data_length(), 50);
        assert_eq!(config.default_refresh_interval_ms(), 15_000);
        assert_eq!(config.server_url(), "http://localhost:8080/jsonrpc");
    }

    #[test]
    fn test_resolve_config_path_default() {
        let args: Vec<String> = vec!["vc-console".to_string()];
        if env::var("CONFIG_FILE").is_err() {
            assert_eq!(Config::resolve_config_path(&args), "config/dev.toml");
        }
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> = vec![
            "vc-console".to_string(),
            "--config".to_string(),
            "config/lab.toml".to_string(),
        ];
        assert_eq!(Config::resolve_config_path(&args), "config/lab.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["vc-console".to_string(), "--config=config/site.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/site.toml");
    }

    #[test]
    fn test_with_max_exchanges() {
        let config = Config::default().with_max_exchanges(5);
        assert_eq!(config.max_exchanges(), 5);
    }
}
