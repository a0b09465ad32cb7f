//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Schedule tag names
    #[serde(default)]
    pub tags: RawTagConfig,

    /// Fleet source for the simulation provider
    #[serde(default)]
    pub fleet: RawFleetConfig,
}

fn default_config_version() -> u32 {
    1
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// Seconds between reconciliation passes (default: 900)
    pub interval_secs: Option<u64>,

    /// Fixed wait after issuing a power command before re-polling state
    /// (default: 30)
    pub verify_wait_secs: Option<u64>,

    /// Evaluate decisions without issuing power commands
    pub dry_run: Option<bool>,
}

/// Schedule tag names, keyed exactly against machine tags
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTagConfig {
    /// Deny-start tag name (default: "NoStartSchedule")
    pub deny_start: Option<String>,

    /// Allow-start tag name (default: "AutoShutdownSchedule")
    pub allow_start: Option<String>,
}

/// Fleet source settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawFleetConfig {
    /// Path to the fleet file
    pub path: Option<PathBuf>,
}
