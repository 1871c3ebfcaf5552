//! # Configuration Management for nscache
//!
//! This crate provides the configuration structures for the namespaced cache:
//! the Redis connection settings and the application/module tag that every
//! cache key is prefixed with.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CacheConfig, NamespaceConfig};
//!
//! let cache_config = CacheConfig::new("redis://localhost:6379".to_string(), 5000, 3000);
//! let namespace = NamespaceConfig::new("cb".to_string(), "users".to_string());
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [cache]
//! redis_url = "redis://localhost:6379"
//! timeout_ms = 5000
//! connection_timeout_ms = 3000
//!
//! [namespace]
//! app = "cb"
//! module = "users"
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from ./nscache.toml or the path in NSCACHE_CONFIG
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./nscache.toml";
const CONFIG_PATH_VAR: &str = "NSCACHE_CONFIG";

/// Separator used between key parts; namespace tags must not contain it.
pub const KEY_SEPARATOR: char = ':';

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub cache: CacheConfig,
    #[serde(default)]
    pub namespace: NamespaceConfig,
}

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    /// Per-command response timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

/// Application and module tags that prefix every key (`app:module:<category>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub app: String,
    pub module: String,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_connection_timeout_ms() -> u64 {
    3000
}

impl AppConfig {
    /// Load configuration from the TOML file named in `.env`/environment or the default path
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            // A missing .env file is fine, a malformed one is not
            if !e.not_found() {
                return Err(e.into());
            }
        }

        let config = if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
            )))
        }?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.redis_url.is_empty() {
            return Err(ConfigError::Invalid(
                "Redis URL cannot be empty".to_string(),
            ));
        }
        if self.cache.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache connection_timeout_ms must be greater than 0".to_string(),
            ));
        }

        self.namespace.validate()
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(redis_url: String, timeout_ms: u64, connection_timeout_ms: u64) -> Self {
        Self {
            redis_url,
            timeout_ms,
            connection_timeout_ms,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            timeout_ms: default_timeout_ms(),
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }
}

impl NamespaceConfig {
    /// Create a new namespace configuration
    pub fn new(app: String, module: String) -> Self {
        Self { app, module }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, tag) in [("app", &self.app), ("module", &self.module)] {
            if tag.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Namespace {} cannot be empty",
                    name
                )));
            }
            if tag.contains(KEY_SEPARATOR) {
                return Err(ConfigError::Invalid(format!(
                    "Namespace {} '{}' cannot contain '{}'",
                    name, tag, KEY_SEPARATOR
                )));
            }
        }
        Ok(())
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            app: "cb".to_string(),
            module: "users".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_full_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [cache]
            redis_url = "redis://cache.internal:6380/2"
            timeout_ms = 250
            connection_timeout_ms = 1000

            [namespace]
            app = "shop"
            module = "orders"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.redis_url, "redis://cache.internal:6380/2");
        assert_eq!(config.cache.timeout_ms, 250);
        assert_eq!(config.cache.connection_timeout_ms, 1000);
        assert_eq!(
            config.namespace,
            NamespaceConfig::new("shop".to_string(), "orders".to_string())
        );
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = AppConfig::from_toml_str(
            r#"
            [cache]
            redis_url = "redis://localhost:6379"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.timeout_ms, 5000);
        assert_eq!(config.cache.connection_timeout_ms, 3000);
        assert_eq!(config.namespace, NamespaceConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            r#"
            [cache]
            redis_url = ""
            "#,
            r#"
            [cache]
            redis_url = "redis://localhost"
            timeout_ms = 0
            "#,
            r#"
            [cache]
            redis_url = "redis://localhost"
            connection_timeout_ms = 0
            "#,
            r#"
            [cache]
            redis_url = "redis://localhost"
            [namespace]
            app = ""
            module = "users"
            "#,
            r#"
            [cache]
            redis_url = "redis://localhost"
            [namespace]
            app = "cb"
            module = "users:v2"
            "#,
        ];

        for case in cases {
            let result = AppConfig::from_toml_str(case);
            assert!(
                matches!(result, Err(ConfigError::Invalid(_))),
                "Should reject config: {}",
                case
            );
        }
    }

    #[test]
    fn test_malformed_toml() {
        let result = AppConfig::from_toml_str("[cache\nredis_url = 1");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nredis_url = \"redis://127.0.0.1:6379\"").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cache.redis_url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_file("/nonexistent/nscache.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
