//! # Application Configuration
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config`)
//! 3. `ASSET_LEDGER_*` environment variables
//! 4. CLI flags (applied by the `cli` module)
//!
//! ```toml
//! log_format = "json"
//!
//! [storage]
//! database = "/var/lib/asset-ledger/ledger.redb"
//! backend = "redb"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! rate_limit = 100
//! cors_origins = ["https://inventory.example.org"]
//!
//! [ledger]
//! history_years = 10
//! ```

use ledger_core::{LedgerError, LedgerPolicy, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default requests per second accepted by the HTTP server.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    Env { key: &'static str, value: String },
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// redb embedded database (persistent).
    #[default]
    Redb,
    /// In-memory store (volatile).
    Memory,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::Memory => "memory",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub backend: BackendKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("asset-ledger.redb"),
            backend: BackendKind::Redb,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Allowed CORS origins; `["*"]` allows all. Empty means localhost only.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_format: LogFormat,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub ledger: LedgerPolicy,
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `ASSET_LEDGER_*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(database) = lookup("ASSET_LEDGER_DATABASE") {
            self.storage.database = PathBuf::from(database);
        }
        if let Some(backend) = lookup("ASSET_LEDGER_BACKEND") {
            self.storage.backend = match backend.trim() {
                "redb" => BackendKind::Redb,
                "memory" => BackendKind::Memory,
                _ => {
                    return Err(ConfigError::Env {
                        key: "ASSET_LEDGER_BACKEND",
                        value: backend,
                    });
                }
            };
        }
        if let Some(host) = lookup("ASSET_LEDGER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("ASSET_LEDGER_PORT") {
            self.server.port = parse_env("ASSET_LEDGER_PORT", port)?;
        }
        if let Some(rate) = lookup("ASSET_LEDGER_RATE_LIMIT") {
            self.server.rate_limit = parse_env("ASSET_LEDGER_RATE_LIMIT", rate)?;
        }
        if let Some(origins) = lookup("ASSET_LEDGER_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(format) = lookup("ASSET_LEDGER_LOG_FORMAT") {
            self.log_format = match format.trim() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }
        if let Some(years) = lookup("ASSET_LEDGER_HISTORY_YEARS") {
            self.ledger.history_years = parse_env("ASSET_LEDGER_HISTORY_YEARS", years)?;
        }
        Ok(())
    }

    /// Open the configured storage backend.
    pub fn open_backend(&self) -> Result<StorageBackend, LedgerError> {
        match self.storage.backend {
            BackendKind::Redb => StorageBackend::open_redb(&self.storage.database),
            BackendKind::Memory => Ok(StorageBackend::default()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, BackendKind::Redb);
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
        assert_eq!(config.server.rate_limit, DEFAULT_RATE_LIMIT);
        assert_eq!(config.ledger, LedgerPolicy::default());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            log_format = "json"

            [server]
            port = 9090

            [ledger]
            history_years = 3
            "#,
        )
        .expect("parse");

        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.ledger.history_years, 3);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(AppConfig::from_toml_str("[storage]\nbackend = \"floppy\"").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = AppConfig::from_toml_str("[server]\nport = 9090").expect("parse");
        config
            .apply_env(env(&[
                ("ASSET_LEDGER_PORT", "7070"),
                ("ASSET_LEDGER_BACKEND", "memory"),
                ("ASSET_LEDGER_CORS_ORIGINS", "https://a.example, https://b.example,"),
                ("ASSET_LEDGER_HISTORY_YEARS", "5"),
            ]))
            .expect("env");

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(
            config.server.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.ledger.history_years, 5);
    }

    #[test]
    fn bad_env_value_names_the_key() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("ASSET_LEDGER_PORT", "eighty")]))
            .expect_err("bad port");
        assert!(err.to_string().contains("ASSET_LEDGER_PORT"));
    }

    #[test]
    fn memory_backend_opens_without_disk() {
        let mut config = AppConfig::default();
        config.storage.backend = BackendKind::Memory;
        let backend = config.open_backend().expect("open");
        assert!(!backend.is_persistent());
    }
}
