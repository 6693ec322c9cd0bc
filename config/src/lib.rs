//! # Configuration Management for DaoBase
//!
//! This crate provides the connection descriptors that every DaoBase component
//! resolves from a connection tag, plus health-check settings.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{AppConfig, DatabaseConfig, ConfigResolver};
//!
//! let common = DatabaseConfig::new(
//!     "localhost".to_string(), 3306, "shop".to_string(),
//!     "root".to_string(), "secret".to_string(),
//! );
//!
//! let config = AppConfig::default().with_database("common", common);
//! assert_eq!(config.resolve("common").unwrap().database, "shop");
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [databases.common]
//! host = "localhost"
//! port = 3306
//! database = "shop"
//! username = "root"
//! password = "secret"
//! charset = "utf8mb4"
//! connect_timeout_seconds = 5
//!
//! [databases.stats]
//! host = "10.0.0.12"
//! database = "stats"
//! username = "reporter"
//! password = ""
//!
//! [health]
//! ping_interval_seconds = 60
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from daobase.toml (or the path in DAOBASE_CONFIG)
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./daobase.toml";
const CONFIG_PATH_VAR: &str = "DAOBASE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("No database configured for tag '{0}'")]
    UnknownTag(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Resolves a connection tag into the descriptor used to open a connection
pub trait ConfigResolver: Send + Sync {
    /// Look up the descriptor for `tag`; unknown or empty tags are an error
    fn resolve(&self, tag: &str) -> Result<DatabaseConfig, ConfigError>;

    /// Name of the database a tag points at
    fn database_name(&self, tag: &str) -> Result<String, ConfigError> {
        self.resolve(tag).map(|config| config.database)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub databases: HashMap<String, DatabaseConfig>,
    #[serde(default)]
    pub health: HealthConfig,
}

/// Connection descriptor for one logical database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Connection keep-alive configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    pub ping_interval_seconds: u64,
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ping_interval_seconds: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from the TOML file named in .env / the environment, or the default path
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine, a malformed one is not
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified as {} in the environment/.env file or in {} file",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
            )))
        }
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

    /// Add or replace the descriptor for a tag
    pub fn with_database(mut self, tag: impl Into<String>, database: DatabaseConfig) -> Self {
        self.databases.insert(tag.into(), database);
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.databases.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one database must be configured".to_string(),
            ));
        }

        for (tag, database) in &self.databases {
            if tag.is_empty() {
                return Err(ConfigError::Invalid(
                    "Database tag cannot be empty".to_string(),
                ));
            }
            if database.host.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Database host cannot be empty (tag '{}')",
                    tag
                )));
            }
            if database.port == 0 {
                return Err(ConfigError::Invalid(format!(
                    "Database port cannot be zero (tag '{}')",
                    tag
                )));
            }
            if database.database.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Database name cannot be empty (tag '{}')",
                    tag
                )));
            }
            if database.username.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Database username cannot be empty (tag '{}')",
                    tag
                )));
            }
            if database.connect_timeout_seconds == 0 {
                return Err(ConfigError::Invalid(format!(
                    "Database connect_timeout_seconds must be greater than 0 (tag '{}')",
                    tag
                )));
            }
        }

        if self.health.ping_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Health ping_interval_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ConfigResolver for AppConfig {
    fn resolve(&self, tag: &str) -> Result<DatabaseConfig, ConfigError> {
        self.databases
            .get(tag)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTag(tag.to_string()))
    }
}

impl DatabaseConfig {
    /// Create a new database configuration with default port options
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
            charset: default_charset(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_seconds = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [databases.common]
        host = "localhost"
        port = 3306
        database = "shop"
        username = "root"
        password = "secret"

        [databases.stats]
        host = "10.0.0.12"
        database = "stats"
        username = "reporter"

        [health]
        ping_interval_seconds = 30
    "#;

    #[test]
    fn test_parse_multiple_tags() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.databases.len(), 2);
        assert_eq!(config.health.ping_interval_seconds, 30);

        let stats = config.resolve("stats").unwrap();
        assert_eq!(stats.port, 3306);
        assert_eq!(stats.charset, "utf8mb4");
        assert_eq!(stats.password, "");
        assert_eq!(stats.connect_timeout_seconds, 10);
    }

    #[test]
    fn test_unknown_tag_is_configuration_error() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert!(matches!(
            config.resolve("missing"),
            Err(ConfigError::UnknownTag(tag)) if tag == "missing"
        ));
        assert!(matches!(config.resolve(""), Err(ConfigError::UnknownTag(_))));
    }

    #[test]
    fn test_database_name_helper() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.database_name("common").unwrap(), "shop");
    }

    #[test]
    fn test_health_defaults_when_section_missing() {
        let config = AppConfig::from_toml_str(
            r#"
            [databases.common]
            host = "localhost"
            database = "shop"
            username = "root"
            "#,
        )
        .unwrap();
        assert_eq!(config.health, HealthConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let empty = AppConfig::from_toml_str("");
        assert!(matches!(empty, Err(ConfigError::Invalid(_))));

        let no_host = AppConfig::from_toml_str(
            r#"
            [databases.common]
            host = ""
            database = "shop"
            username = "root"
            "#,
        );
        assert!(matches!(no_host, Err(ConfigError::Invalid(msg)) if msg.contains("host")));

        let zero_ping = AppConfig::from_toml_str(
            r#"
            [databases.common]
            host = "localhost"
            database = "shop"
            username = "root"

            [health]
            ping_interval_seconds = 0
            "#,
        );
        assert!(matches!(zero_ping, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert!(config.databases.contains_key("common"));
    }

    #[test]
    fn test_descriptor_builders() {
        let config = DatabaseConfig::new(
            "db.local".to_string(),
            3307,
            "shop".to_string(),
            "app".to_string(),
            "pw".to_string(),
        )
        .with_charset("utf8")
        .with_connect_timeout(3);
        assert_eq!(config.charset, "utf8");
        assert_eq!(config.connect_timeout_seconds, 3);
    }
}
