//! ViewBus Settings Crate
//!
//! Handles the configuration file: bus behaviour and logging output.

pub mod config;
pub mod error;

pub use config::{BusSettings, Config, LoggingSettings, LOG_LEVELS};
pub use error::{ConfigError, SettingsError, SettingsResult};
