//! Configuration loading and management.

mod loader;

pub use loader::{Config, ConfigError, OutputMode, Settings, example_config};
