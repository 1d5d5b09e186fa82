/// Configuration management for lined
///
/// lined reads its configuration from $LINED_CONFIG or ~/.lined/config.toml.
/// A missing file means defaults.

use crate::audit_log::{DEFAULT_RETENTION, MIN_RETENTION};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "LINED_CONFIG";

const DEFAULT_MAX_STRING_LENGTH: usize = 1024;
const DEFAULT_MAX_PATH_LENGTH: usize = 256;
const DEFAULT_LOG_PATH: &str = "editorback.log";
const DEFAULT_LOG_LINE_LENGTH: usize = 2560;
/// Shortest log line limit that still fits a timestamp and a description
const MIN_LOG_LINE_LENGTH: usize = 64;

/// lined configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Argument limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Audit log settings
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Longest text, key or substitute argument; also the line limit for
    /// search and replace
    #[serde(default = "default_max_string_length")]
    pub max_string_length: Option<usize>,

    /// Longest file path or pattern argument
    #[serde(default = "default_max_path_length")]
    pub max_path_length: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_string_length: Some(DEFAULT_MAX_STRING_LENGTH),
            max_path_length: Some(DEFAULT_MAX_PATH_LENGTH),
        }
    }
}

impl LimitsConfig {
    pub fn max_string_length(&self) -> usize {
        self.max_string_length.unwrap_or(DEFAULT_MAX_STRING_LENGTH)
    }

    pub fn max_path_length(&self) -> usize {
        self.max_path_length.unwrap_or(DEFAULT_MAX_PATH_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Audit log location, relative to the working directory
    #[serde(default = "default_log_path")]
    pub path: Option<String>,

    /// Entries kept before the oldest are rotated out
    #[serde(default = "default_retention")]
    pub retention: Option<usize>,

    /// Longest accepted audit log line, newline included
    #[serde(default = "default_log_line_length")]
    pub max_line_length: Option<usize>,

    /// Write tracing diagnostics to ~/.lined/lined.log
    #[serde(default = "default_debug")]
    pub debug: Option<bool>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: Some(DEFAULT_LOG_PATH.to_string()),
            retention: Some(DEFAULT_RETENTION),
            max_line_length: Some(DEFAULT_LOG_LINE_LENGTH),
            debug: Some(false),
        }
    }
}

impl LogConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.path.as_deref().unwrap_or(DEFAULT_LOG_PATH))
    }

    pub fn retention(&self) -> usize {
        self.retention.unwrap_or(DEFAULT_RETENTION)
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length.unwrap_or(DEFAULT_LOG_LINE_LENGTH)
    }

    pub fn debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }
}

// Default functions for serde
fn default_max_string_length() -> Option<usize> { Some(DEFAULT_MAX_STRING_LENGTH) }
fn default_max_path_length() -> Option<usize> { Some(DEFAULT_MAX_PATH_LENGTH) }
fn default_log_path() -> Option<String> { Some(DEFAULT_LOG_PATH.to_string()) }
fn default_retention() -> Option<usize> { Some(DEFAULT_RETENTION) }
fn default_log_line_length() -> Option<usize> { Some(DEFAULT_LOG_LINE_LENGTH) }
fn default_debug() -> Option<bool> { Some(false) }

/// Get the configuration file path
///
/// $LINED_CONFIG wins over ~/.lined/config.toml.
pub fn config_file_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".lined").join("config.toml"))
}

/// Load configuration, falling back to defaults when there is no file
pub fn load_config() -> Result<Config> {
    let config_path = config_file_path()?;
    if !config_path.exists() {
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    parse_config(&config_str)
        .with_context(|| format!("Malformed config file: {}", config_path.display()))
}

/// Parse and validate a TOML configuration
pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(config_str).context("Failed to parse config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if config.limits.max_string_length == Some(0) {
        anyhow::bail!("Invalid max_string_length: 0 (must be positive)");
    }

    if config.limits.max_path_length == Some(0) {
        anyhow::bail!("Invalid max_path_length: 0 (must be positive)");
    }

    if let Some(path) = &config.log.path {
        if path.is_empty() {
            anyhow::bail!("Invalid log path: empty");
        }
    }

    if let Some(retention) = config.log.retention {
        if retention < MIN_RETENTION {
            anyhow::bail!("Invalid retention: {} (min {})", retention, MIN_RETENTION);
        }
    }

    if let Some(max) = config.log.max_line_length {
        if max < MIN_LOG_LINE_LENGTH {
            anyhow::bail!("Invalid log max_line_length: {} (min {})", max, MIN_LOG_LINE_LENGTH);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.max_string_length(), 1024);
        assert_eq!(config.limits.max_path_length(), 256);
        assert_eq!(config.log.path(), PathBuf::from("editorback.log"));
        assert_eq!(config.log.retention(), 200);
        assert_eq!(config.log.max_line_length(), 2560);
        assert!(!config.log.debug());
    }

    #[test]
    fn test_validate_config_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config("[log]\nretention = 50\n").unwrap();
        assert_eq!(config.log.retention(), 50);
        assert_eq!(config.log.max_line_length(), 2560);
        assert_eq!(config.limits.max_string_length(), 1024);
    }

    #[test]
    fn test_validate_config_invalid_retention() {
        let mut config = Config::default();
        config.log.retention = Some(9);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_lengths() {
        let mut config = Config::default();
        config.limits.max_path_length = Some(0);
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.log.max_line_length = Some(20);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(parse_config("[log\nretention = ").is_err());
        assert!(parse_config("[log]\nretention = \"many\"\n").is_err());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[limits]"));
        assert!(toml_str.contains("[log]"));
    }
}
