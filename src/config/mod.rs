//! Configuration management.
//!
//! Configuration is read from TOML, then overridden by environment variables:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `FRAMEDEX_BACKEND` | `store.backend` |
//! | `FRAMEDEX_ENDPOINT` | `store.endpoint` |
//! | `FRAMEDEX_API_KEY` | `store.api_key` |
//! | `FRAMEDEX_DATA_DIR` | `store.data_dir` |
//!
//! A `.env` file in the working directory is loaded first (see `main.rs`).

use crate::observability::LogFormat;
use crate::store::DEFAULT_PAGE_SIZE;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default number of concurrent deletes per replace-all batch.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 10;

/// Main configuration for framedex.
#[derive(Debug, Clone, Default)]
pub struct FramedexConfig {
    /// Record store settings.
    pub store: StoreSettings,
    /// Import run settings.
    pub import: ImportSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Available store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// In-process, not persisted.
    Memory,
    /// JSON snapshots under `data_dir`.
    #[default]
    File,
    /// Managed GraphQL API.
    Graphql,
}

impl StoreBackend {
    /// Parses a backend string.
    ///
    /// Returns `None` if the backend is not recognized.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "file" | "fs" | "filesystem" => Some(Self::File),
            "graphql" | "gql" | "appsync" => Some(Self::Graphql),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Graphql => "graphql",
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown store backend '{s}' (expected memory, file or graphql)"
            ))
        })
    }
}

/// Record store settings.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Backend to use.
    pub backend: StoreBackend,
    /// GraphQL endpoint URL.
    pub endpoint: Option<String>,
    /// GraphQL API key.
    pub api_key: Option<SecretString>,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Directory for the file backend.
    pub data_dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
            data_dir: PathBuf::from(".framedex"),
        }
    }
}

/// Import run settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    /// Page size for full-collection fetches.
    pub page_size: usize,
    /// Concurrent deletes per replace-all batch.
    pub delete_batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when unset.
    pub file: Option<PathBuf>,
    /// Default filter directive (e.g. `info`, `framedex=debug`).
    pub level: Option<String>,
}

/// Metrics settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Whether to expose a Prometheus listener.
    pub enabled: bool,
    /// Listener port.
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Store section.
    pub store: Option<ConfigFileStore>,
    /// Import section.
    pub import: Option<ConfigFileImport>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Store section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStore {
    /// Backend name.
    pub backend: Option<String>,
    /// GraphQL endpoint.
    pub endpoint: Option<String>,
    /// API key; wrapped in a `SecretString` on load.
    pub api_key: Option<String>,
    /// HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Data directory.
    pub data_dir: Option<String>,
}

/// Import section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileImport {
    /// Page size.
    pub page_size: Option<usize>,
    /// Delete batch size.
    pub delete_batch_size: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
    /// Filter directive.
    pub level: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMetrics {
    /// Enable the Prometheus listener.
    pub enabled: Option<bool>,
    /// Listener port.
    pub port: Option<u16>,
}

impl FramedexConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is invalid.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<platform config dir>/framedex/config.toml`, then
    /// `~/.config/framedex/config.toml`. Returns defaults if neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let candidates = [
            base_dirs.config_dir().join("framedex").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("framedex")
                .join("config.toml"),
        ];
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Converts a `ConfigFile` to `FramedexConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(store) = file.store {
            if let Some(backend) = store.backend {
                config.store.backend = backend.parse()?;
            }
            config.store.endpoint = store.endpoint;
            config.store.api_key = store.api_key.map(SecretString::from);
            if let Some(timeout) = store.timeout_secs {
                config.store.timeout_secs = timeout;
            }
            if let Some(dir) = store.data_dir {
                config.store.data_dir = PathBuf::from(dir);
            }
        }
        if let Some(import) = file.import {
            if let Some(size) = import.page_size {
                config.import.page_size = size.max(1);
            }
            if let Some(size) = import.delete_batch_size {
                config.import.delete_batch_size = size.max(1);
            }
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = format.parse()?;
            }
            config.logging.file = logging.file.map(PathBuf::from);
            config.logging.level = logging.level;
        }
        if let Some(metrics) = file.metrics {
            if let Some(enabled) = metrics.enabled {
                config.metrics.enabled = enabled;
            }
            if let Some(port) = metrics.port {
                config.metrics.port = port;
            }
        }

        Ok(config)
    }

    /// Applies `FRAMEDEX_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if `FRAMEDEX_BACKEND` names an unknown backend.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = lookup("FRAMEDEX_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Some(endpoint) = lookup("FRAMEDEX_ENDPOINT") {
            self.store.endpoint = Some(endpoint);
        }
        if let Some(api_key) = lookup("FRAMEDEX_API_KEY") {
            self.store.api_key = Some(SecretString::from(api_key));
        }
        if let Some(dir) = lookup("FRAMEDEX_DATA_DIR") {
            self.store.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Sets the store backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.store.backend = backend;
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.data_dir = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = FramedexConfig::default();
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.import.page_size, 1000);
        assert_eq!(config.import.delete_batch_size, 10);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_from_toml() {
        let config = FramedexConfig::from_toml(
            r#"
[store]
backend = "graphql"
endpoint = "https://example.appsync-api.test/graphql"
api_key = "da2-secret"
timeout_secs = 5

[import]
page_size = 200
delete_batch_size = 0

[logging]
format = "json"
level = "debug"

[metrics]
enabled = true
port = 9100
"#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Graphql);
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(
            config.store.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("da2-secret".to_string())
        );
        assert_eq!(config.import.page_size, 200);
        assert_eq!(config.import.delete_batch_size, 1);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.metrics.port, 9100);
    }

    #[test]
    fn test_unknown_backend_is_error() {
        assert!(FramedexConfig::from_toml("[store]\nbackend = \"sqlite\"\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FRAMEDEX_BACKEND", "memory"),
            ("FRAMEDEX_DATA_DIR", "/tmp/framedex"),
            ("FRAMEDEX_ENDPOINT", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = FramedexConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/framedex"));
        assert!(config.store.endpoint.is_none());
    }

    #[test]
    fn test_api_key_is_redacted_in_debug() {
        let mut config = FramedexConfig::default();
        config.store.api_key = Some(SecretString::from("da2-secret".to_string()));
        assert!(!format!("{config:?}").contains("da2-secret"));
    }
}
