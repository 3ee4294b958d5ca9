//! Configuration management for the ftpgate daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/ftpgate/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} port must be greater than 0")]
    InvalidPort(&'static str),

    #[error("passive port range {start}-{end} is invalid")]
    InvalidPassivePorts { start: u16, end: u16 },

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("{0} must be an absolute path, got {1}")]
    RelativePath(&'static str, String),

    #[error("invalid {0} listen address: {1}")]
    InvalidAddress(&'static str, String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the ftpgate daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// Settings handed to the FTP transport engine.
    pub ftp: FtpConfig,

    /// Tenant storage layout.
    pub storage: StorageConfig,

    /// Credential store location.
    pub credentials: CredentialsConfig,

    /// Credential rotation API.
    pub api: ApiConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily rolling log files. Logs go to stderr only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// JSON file listing the active tenants. When unset, every directory
    /// under `storage.base_path` is a tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenants_file: Option<PathBuf>,
}

/// FTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FtpConfig {
    /// Address the FTP engine binds to.
    pub address: String,

    /// Control channel port.
    pub port: u16,

    /// Reject every mutating operation.
    pub read_only: bool,

    /// Port range for passive data connections.
    pub passive_ports: PortRange,

    /// Banner shown to connecting clients.
    pub banner: String,
}

/// Inclusive port range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

/// Tenant storage layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per tenant.
    pub base_path: PathBuf,
}

/// Credential store location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Directory holding one `<identity>.txt` file per credential.
    pub root: PathBuf,
}

/// Rotation API listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Address the HTTP API binds to.
    pub address: String,

    /// HTTP port.
    pub port: u16,

    /// Bearer token required on API requests, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            tenants_file: None,
        }
    }
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 2022,
            read_only: false,
            passive_ports: PortRange::default(),
            banner: "ftpgate FTP server".to_string(),
        }
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: 40000,
            end: 50000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/var/lib/ftpgate/volumes"),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/lib/ftpgate/passwords"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8090,
            token: None,
        }
    }
}

impl FtpConfig {
    /// Socket address of the FTP listener.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("ftp", &self.address, self.port)
    }
}

impl ApiConfig {
    /// Socket address of the HTTP API.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("api", &self.address, self.port)
    }
}

fn parse_addr(section: &'static str, address: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    format!("{}:{}", address, port)
        .parse()
        .map_err(|_| ConfigError::InvalidAddress(section, address.to_string()))
}

/// A set, non-empty environment variable.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ftpgate")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FTPGATE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - FTPGATE_BASE_PATH: Override the tenant storage base path
    /// - FTPGATE_READ_ONLY: Force read-only mode (`true`/`1`/`yes`)
    /// - FTPGATE_API_TOKEN: Override the rotation API bearer token
    ///
    /// Runs before logging is set up, so the names of the applied variables
    /// are returned for the caller to log.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(level) = env_value("FTPGATE_LOG_LEVEL") {
            self.daemon.log_level = level;
            applied.push("FTPGATE_LOG_LEVEL");
        }

        if let Some(base) = env_value("FTPGATE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(base);
            applied.push("FTPGATE_BASE_PATH");
        }

        if let Some(flag) = env_value("FTPGATE_READ_ONLY") {
            self.ftp.read_only = matches!(
                flag.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
            applied.push("FTPGATE_READ_ONLY");
        }

        if let Some(token) = env_value("FTPGATE_API_TOKEN") {
            self.api.token = Some(token);
            applied.push("FTPGATE_API_TOKEN");
        }

        applied
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ftp.port == 0 {
            return Err(ConfigError::InvalidPort("ftp"));
        }
        if self.api.port == 0 {
            return Err(ConfigError::InvalidPort("api"));
        }

        let PortRange { start, end } = self.ftp.passive_ports;
        if start == 0 || start > end {
            return Err(ConfigError::InvalidPassivePorts { start, end });
        }

        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        if !self.storage.base_path.is_absolute() {
            return Err(ConfigError::RelativePath(
                "storage.base_path",
                self.storage.base_path.display().to_string(),
            ));
        }
        if !self.credentials.root.is_absolute() {
            return Err(ConfigError::RelativePath(
                "credentials.root",
                self.credentials.root.display().to_string(),
            ));
        }

        self.ftp.listen_addr()?;
        self.api.listen_addr()?;

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
