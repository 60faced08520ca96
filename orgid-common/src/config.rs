//! Bootstrap configuration
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ORGID_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Layers 1 and 2 are parsed by the binary and applied with
//! [`OrgIdConfig::apply`]. A missing TOML file is not an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Published labeled-test sheet (CSV export)
pub const DEFAULT_TEST_DATA_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vR_sVx4ts9ndZJ6UP8mPqKd-Rw_v-_A_ShaIvgIE4QhmdPeNb5H7GUPZIBZiMEXvLax1iAChlH6Mk6W/pub?output=csv";

/// Service configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgIdConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Flattened registry CSV, relative to the working directory unless absolute
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// URL of the labeled test sheet
    #[serde(default = "default_test_data_url")]
    pub test_data_url: String,

    /// Sent in the User-Agent when fetching test data
    #[serde(default)]
    pub openalex_api_key: Option<String>,

    /// Extra gazetteer entries (`name,kind,country` CSV)
    #[serde(default)]
    pub gazetteer_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("ror_with_openalex.csv")
}

fn default_test_data_url() -> String {
    DEFAULT_TEST_DATA_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OrgIdConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            registry_path: default_registry_path(),
            test_data_url: default_test_data_url(),
            openalex_api_key: None,
            gazetteer_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Values given on the command line or in the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub registry_path: Option<PathBuf>,
    pub test_data_url: Option<String>,
    pub openalex_api_key: Option<String>,
    pub gazetteer_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl OrgIdConfig {
    /// Load from a TOML file. A missing file yields defaults with a warning;
    /// an unreadable or malformed file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text; absent keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line/environment values on top of the file values
    pub fn apply(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(path) = overrides.registry_path {
            self.registry_path = path;
        }
        if let Some(url) = overrides.test_data_url {
            self.test_data_url = url;
        }
        if let Some(key) = overrides.openalex_api_key {
            self.openalex_api_key = Some(key);
        }
        if let Some(path) = overrides.gazetteer_path {
            self.gazetteer_path = Some(path);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}' (expected one of: {})",
                self.logging.level,
                LEVELS.join(", ")
            )));
        }
        if self.test_data_url.trim().is_empty() {
            return Err(Error::Config("test_data_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Registry path resolved against the working directory
    pub fn resolved_registry_path(&self) -> PathBuf {
        if self.registry_path.is_absolute() {
            return self.registry_path.clone();
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(&self.registry_path),
            Err(_) => self.registry_path.clone(),
        }
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrgIdConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.registry_path, PathBuf::from("ror_with_openalex.csv"));
        assert_eq!(config.logging.level, "info");
        assert!(config.openalex_api_key.is_none());
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config =
            OrgIdConfig::from_toml_str("port = 9100\n[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.test_data_url, DEFAULT_TEST_DATA_URL);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = OrgIdConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides_win() {
        let config = OrgIdConfig::from_toml_str("port = 9100\nregistry_path = \"a.csv\"\n")
            .unwrap()
            .apply(ConfigOverrides {
                port: Some(9200),
                log_level: Some("warn".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.registry_path, PathBuf::from("a.csv"));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_absolute_registry_path_kept() {
        let config = OrgIdConfig {
            registry_path: PathBuf::from("/data/ror.csv"),
            ..Default::default()
        };
        assert_eq!(config.resolved_registry_path(), PathBuf::from("/data/ror.csv"));
    }
}
