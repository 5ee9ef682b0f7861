//! Configuration loading and management.

use crate::sysfs::SYSFS_USB_DEVICES;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Application configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,
}

/// What to print when no command is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One "<manufacturer> <product>" line per device.
    #[default]
    Names,
    /// Full descriptor dump of every device.
    Tree,
}

/// Global settings.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Directory listing USB devices.
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Default output mode.
    #[serde(default)]
    pub mode: OutputMode,

    /// Log filter directive, used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            mode: OutputMode::default(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(SYSFS_USB_DEVICES)
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from default locations.
    /// Search order:
    /// 1. ./usbnames.toml
    /// 2. ~/.config/usbnames/config.toml
    /// 3. /etc/usbnames.toml
    pub fn load() -> Result<Self, ConfigError> {
        let paths = Self::config_paths();

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // No config file found - use defaults
        Ok(Config::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Get list of possible config paths.
    fn config_paths() -> Vec<Option<PathBuf>> {
        vec![
            std::env::current_dir().ok().map(|p| p.join("usbnames.toml")),
            dirs::config_dir().map(|p| p.join("usbnames").join("config.toml")),
            Some(PathBuf::from("/etc/usbnames.toml")),
        ]
    }
}

/// Generate example configuration content.
pub fn example_config() -> &'static str {
    r#"# usbnames configuration file
# Place in ./usbnames.toml, ~/.config/usbnames/config.toml, or /etc/usbnames.toml

[settings]
# Directory listing USB devices
sysfs_root = "/sys/bus/usb/devices"
# Output when no command is given: "names" or "tree"
mode = "names"
# Log filter (tracing EnvFilter syntax); RUST_LOG takes precedence
log_filter = "warn"
"#
}
