//! Configuration management with TOML support
//!
//! This module provides the configuration system that:
//! - Loads from TOML files
//! - Supports environment variable overrides (`FAULTLINE_*`)
//! - Validates configuration values
//!
//! The single [`Environment`] switch decides whether diagnostics are emitted
//! to the console (development) or mirrored silently (production), and
//! whether stack traces appear in boundary fallbacks.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::client::ClientConfig;
use crate::error::{FaultlineError, FaultlineResult};
use crate::error_log::{ErrorLog, ErrorLogConfig, FileMirror};

/// Environment variable selecting [`Environment`]
pub const ENV_VAR: &str = "FAULTLINE_ENV";

/// Development/production switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Read `FAULTLINE_ENV`, falling back to production.
    pub fn from_env() -> Self {
        std::env::var(ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = FaultlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(FaultlineError::configuration(
                "environment",
                format!("Unknown environment '{}'", other),
            )),
        }
    }
}

/// Complete configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub environment: Environment,

    /// Request client configuration
    pub client: ClientSection,

    /// Error log configuration
    pub error_log: ErrorLogSection,

    /// Demo server configuration
    pub server: ServerSection,

    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Base URL prepended to every request path
    pub base_url: Option<String>,

    /// Per-request timeout; expiry surfaces as a network error
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogSection {
    /// In-memory ring capacity
    pub capacity: usize,

    /// Durable mirror capacity
    pub durable_capacity: usize,

    /// File backing the durable mirror; in-memory mirror when unset
    pub mirror_path: Option<PathBuf>,
}

impl Default for ErrorLogSection {
    fn default() -> Self {
        Self {
            capacity: crate::error_log::MAX_ERRORS,
            durable_capacity: crate::error_log::MAX_DURABLE_ERRORS,
            mirror_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_address: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default `EnvFilter` directive
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> FaultlineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            FaultlineError::configuration(
                "config_file",
                format!("Failed to read {}: {}", path.display(), e),
            )
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from an optional file, apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> FaultlineResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> FaultlineResult<()> {
        if let Ok(env) = std::env::var(ENV_VAR) {
            self.environment = env.parse()?;
        }
        if let Ok(url) = std::env::var(crate::client::BASE_URL_ENV) {
            self.client.base_url = Some(url);
        }
        if let Ok(addr) = std::env::var("FAULTLINE_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Ok(level) = std::env::var("FAULTLINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(path) = std::env::var("FAULTLINE_ERROR_MIRROR") {
            self.error_log.mirror_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> FaultlineResult<()> {
        if self.error_log.capacity == 0 {
            return Err(FaultlineError::configuration(
                "error_log.capacity",
                "Capacity must be at least 1",
            ));
        }

        if self.error_log.durable_capacity > self.error_log.capacity {
            return Err(FaultlineError::configuration(
                "error_log.durable_capacity",
                "Durable capacity cannot exceed the in-memory capacity",
            ));
        }

        if let Some(url) = &self.client.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(FaultlineError::configuration(
                    "client.base_url",
                    format!("Base URL must be absolute http(s), got '{}'", url),
                ));
            }
        }

        if self.server.bind_address.is_empty() {
            return Err(FaultlineError::configuration(
                "server.bind_address",
                "Bind address cannot be empty",
            ));
        }

        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.client.base_url.clone(),
            timeout: self.client.timeout,
            ..ClientConfig::default()
        }
    }

    pub fn error_log_config(&self) -> ErrorLogConfig {
        ErrorLogConfig {
            environment: self.environment,
            capacity: self.error_log.capacity,
            durable_capacity: self.error_log.durable_capacity,
        }
    }

    /// Error log for this configuration, mirrored to `error_log.mirror_path` when set
    pub fn build_error_log(&self) -> ErrorLog {
        let log = ErrorLog::new(self.error_log_config());
        match &self.error_log.mirror_path {
            Some(path) => log.with_mirror(Box::new(FileMirror::new(path))),
            None => log,
        }
    }
}
