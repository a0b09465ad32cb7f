//! Configuration parsing and validation for warden
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Pass interval, verification wait, and dry-run defaults
//! - Schedule tag name overrides
//! - Fleet file location for the simulation provider

mod schema;

pub use schema::*;

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Tag name for {0} schedule cannot be empty")]
    EmptyTagName(&'static str),

    #[error("daemon.interval_secs must be greater than zero")]
    ZeroInterval,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Default seconds between reconciliation passes
pub const DEFAULT_INTERVAL_SECS: u64 = 900;

/// Default fixed wait before the post-action verification re-poll
pub const DEFAULT_VERIFY_WAIT_SECS: u64 = 30;

/// Default deny-start tag name
pub const DEFAULT_DENY_START_TAG: &str = "NoStartSchedule";

/// Default allow-start tag name
pub const DEFAULT_ALLOW_START_TAG: &str = "AutoShutdownSchedule";

/// Validated configuration ready for use by the reconciler
#[derive(Debug, Clone)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub tags: TagConfig,
    /// Fleet file for the simulation provider, if configured
    pub fleet_path: Option<PathBuf>,
}

/// Daemon settings
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Time between reconciliation passes
    pub interval: Duration,

    /// Fixed wait after issuing a power command before re-polling state
    pub verify_wait: Duration,

    /// Evaluate decisions without issuing power commands
    pub dry_run: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            verify_wait: Duration::from_secs(DEFAULT_VERIFY_WAIT_SECS),
            dry_run: false,
        }
    }
}

/// Schedule tag names
#[derive(Debug, Clone)]
pub struct TagConfig {
    pub deny_start: String,
    pub allow_start: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            deny_start: DEFAULT_DENY_START_TAG.to_string(),
            allow_start: DEFAULT_ALLOW_START_TAG.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            tags: TagConfig::default(),
            fleet_path: None,
        }
    }
}

impl Config {
    /// Convert from raw config (after validation)
    fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig {
                interval: Duration::from_secs(
                    raw.daemon.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
                ),
                verify_wait: Duration::from_secs(
                    raw.daemon
                        .verify_wait_secs
                        .unwrap_or(DEFAULT_VERIFY_WAIT_SECS),
                ),
                dry_run: raw.daemon.dry_run.unwrap_or(false),
            },
            tags: TagConfig {
                deny_start: raw
                    .tags
                    .deny_start
                    .unwrap_or_else(|| DEFAULT_DENY_START_TAG.to_string()),
                allow_start: raw
                    .tags
                    .allow_start
                    .unwrap_or_else(|| DEFAULT_ALLOW_START_TAG.to_string()),
            },
            fleet_path: raw.fleet.path,
        }
    }
}

/// Validate a raw configuration
pub fn validate_config(raw: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if matches!(raw.tags.deny_start.as_deref(), Some("")) {
        errors.push(ValidationError::EmptyTagName("deny-start"));
    }
    if matches!(raw.tags.allow_start.as_deref(), Some("")) {
        errors.push(ValidationError::EmptyTagName("allow-start"));
    }
    if raw.daemon.interval_secs == Some(0) {
        errors.push(ValidationError::ZeroInterval);
    }

    errors
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Config::from_raw(raw))
}
