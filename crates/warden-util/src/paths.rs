//! Default paths for warden components
//!
//! The configuration file is user-level:
//! `$XDG_CONFIG_HOME/warden/config.toml` or `~/.config/warden/config.toml`.

use std::path::PathBuf;

/// Application subdirectory name
const APP_DIR: &str = "warden";

/// Configuration filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/warden/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/warden/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    // Last resort
    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}
