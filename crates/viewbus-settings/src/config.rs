//! Configuration for ViewBus sessions
//!
//! Provides configuration file handling and validation. Supports JSON and TOML
//! file formats; the file extension decides which one is used.
//!
//! Configuration is organized into sections:
//! - Bus settings (handler failure policy, pruning, dispatch tracing)
//! - Logging settings (level, per-target directives, output format)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use viewbus_core::{DispatchErrorPolicy, EventBusConfig};

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Log levels accepted in settings files
pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSettings {
    /// What a publish does when a handler fails
    #[serde(default)]
    pub error_policy: DispatchErrorPolicy,
    /// Drop registrations of subscribers that no longer exist
    #[serde(default = "default_true")]
    pub prune_dead_subscribers: bool,
    /// Trace every handler invocation
    #[serde(default)]
    pub trace_dispatch: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            error_policy: DispatchErrorPolicy::Abort,
            prune_dead_subscribers: true,
            trace_dispatch: false,
        }
    }
}

impl From<&BusSettings> for EventBusConfig {
    fn from(settings: &BusSettings) -> Self {
        Self {
            error_policy: settings.error_policy,
            prune_dead_subscribers: settings.prune_dead_subscribers,
            trace_dispatch: settings.trace_dispatch,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level for every target
    #[serde(default = "default_level")]
    pub level: String,
    /// Extra `target=level` directives
    #[serde(default)]
    pub directives: Vec<String>,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Include thread ids in log lines
    #[serde(default)]
    pub with_thread_ids: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            directives: Vec::new(),
            json: false,
            with_thread_ids: false,
        }
    }
}

impl LoggingSettings {
    /// Filter string in `EnvFilter` syntax
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn is_log_level(value: &str) -> bool {
    LOG_LEVELS.contains(&value.to_ascii_lowercase().as_str())
}

/// Complete ViewBus configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Event bus settings
    #[serde(default)]
    pub bus: BusSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard config file location: `<config_dir>/viewbus/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            SettingsError::ConfigDirectory("no configuration directory on this platform".into())
        })?;
        Ok(dir.join("viewbus").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::LoadError {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load config from file, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::SaveError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| SettingsError::SaveError {
            path: path.display().to_string(),
            source,
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if !is_log_level(&self.logging.level) {
            return Err(ConfigError::ValueOutOfRange {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            }
            .into());
        }

        for directive in &self.logging.directives {
            let valid = directive
                .split_once('=')
                .is_some_and(|(target, level)| !target.trim().is_empty() && is_log_level(level));
            if !valid {
                return Err(SettingsError::InvalidSetting {
                    key: "logging.directives".to_string(),
                    reason: format!("'{}' is not of the form target=level", directive),
                });
            }
        }

        Ok(())
    }

    /// Bus configuration for a new session
    pub fn event_bus_config(&self) -> EventBusConfig {
        EventBusConfig::from(&self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.bus.error_policy, DispatchErrorPolicy::Abort);
        assert!(config.bus.prune_dead_subscribers);
        assert_eq!(config.logging.filter_directives(), "info");
    }

    #[test]
    fn test_filter_directives() {
        let logging = LoggingSettings {
            level: "warn".to_string(),
            directives: vec!["viewbus_core=trace".to_string()],
            ..Default::default()
        };
        assert_eq!(logging.filter_directives(), "warn,viewbus_core=trace");
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let mut config = Config::new();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(SettingsError::Config(ConfigError::ValueOutOfRange { .. }))
        ));

        let mut config = Config::new();
        config.logging.directives.push("viewbus_core".to_string());
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_event_bus_config_conversion() {
        let mut config = Config::new();
        config.bus.error_policy = DispatchErrorPolicy::Continue;
        config.bus.trace_dispatch = true;

        let bus = config.event_bus_config();
        assert_eq!(bus.error_policy, DispatchErrorPolicy::Continue);
        assert!(bus.trace_dispatch);
        assert!(bus.prune_dead_subscribers);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[bus]\nerror_policy = \"continue\"\n")
            .expect("Should parse");
        assert_eq!(config.bus.error_policy, DispatchErrorPolicy::Continue);
        assert!(config.bus.prune_dead_subscribers);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            Config::load_from_file(Path::new("settings.yaml")),
            Err(SettingsError::Config(ConfigError::UnsupportedFormat(ref ext))) if ext == "yaml"
        ));
    }
}
