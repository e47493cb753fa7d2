//! Configuration management for herakles-forecast-monitor.
//!
//! This module handles loading, merging, and validating configuration from
//! files and CLI overrides. It supports YAML, JSON, and TOML formats.
//! Precedence is CLI > config file > defaults.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};

use crate::forecast::DEFAULT_HORIZON;
use crate::monitor::MonitorSettings;
use crate::ringbuffer::DEFAULT_HISTORY_CAPACITY;

// Default configuration constants
pub const DEFAULT_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_MIN_HISTORY: usize = 30;
pub const DEFAULT_SNAPSHOT_EVERY: u64 = 60;
pub const DEFAULT_WARN_PERCENT: f64 = 90.0;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {detail}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        detail: String,
    },

    #[error("Failed to render config as {format}: {detail}")]
    Render { format: &'static str, detail: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Where observations are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Full status screen refreshed every tick
    #[default]
    Console,
    /// One JSON object per tick on stdout
    Json,
    /// Structured log events only
    Log,
}

/// Log level options for CLI parsing and config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Maximum tracing level, `None` for `off`.
    pub fn as_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }

    /// Parses a config-file log level, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        <LogLevel as ValueEnum>::from_str(name, true).ok()
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between ticks
    #[serde(alias = "interval", alias = "interval-seconds")]
    pub interval_seconds: u64,
    /// Ticks to forecast ahead
    #[serde(alias = "forecast-horizon")]
    pub forecast_horizon: usize,
    /// Samples kept per metric
    #[serde(alias = "history-capacity")]
    pub history_capacity: usize,
    /// Samples required before forecasting
    #[serde(alias = "min-history")]
    pub min_history: usize,
    /// Ticks between periodic snapshots
    #[serde(alias = "snapshot-every")]
    pub snapshot_every: u64,
    /// Directory holding snapshot records
    #[serde(alias = "data-dir")]
    pub data_dir: PathBuf,
    /// Apply the 0-100 clamp to temperature forecasts as well
    #[serde(alias = "clamp-temperature")]
    pub clamp_temperature: bool,
    /// Predicted CPU/memory percentage that raises a warning
    #[serde(alias = "warn-percent")]
    pub warn_percent: f64,
    pub output: OutputFormat,
    /// Prometheus exporter address, e.g. "127.0.0.1:9216"
    pub listen: Option<String>,
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            forecast_horizon: DEFAULT_HORIZON,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            min_history: DEFAULT_MIN_HISTORY,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
            data_dir: default_data_dir(),
            clamp_temperature: false,
            warn_percent: DEFAULT_WARN_PERCENT,
            output: OutputFormat::Console,
            listen: None,
            log_level: Some("info".into()),
        }
    }
}

/// Default snapshot directory under the user's data home.
pub fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home)
            .join(".local/share/herakles/forecast-monitor"),
        _ => PathBuf::from("./forecast-monitor-data"),
    }
}

impl Config {
    /// Settings consumed by the monitor loop.
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval: Duration::from_secs(self.interval_seconds),
            horizon: self.forecast_horizon,
            history_capacity: self.history_capacity,
            min_history: self.min_history,
            snapshot_every: self.snapshot_every,
            clamp_temperature: self.clamp_temperature,
        }
    }

    /// Parsed exporter address, if one is configured.
    pub fn listen_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.listen
            .as_deref()
            .map(|addr| {
                addr.parse::<SocketAddr>()
                    .map_err(|e| ConfigError::invalid("listen", format!("'{addr}': {e}")))
            })
            .transpose()
    }

    /// Human-readable horizon, e.g. "1 minute" for 12 ticks of 5 seconds.
    pub fn horizon_label(&self) -> String {
        let seconds = self.interval_seconds.saturating_mul(self.forecast_horizon as u64);
        match seconds {
            60 => "1 minute".to_string(),
            s if s % 60 == 0 && s > 0 => format!("{} minutes", s / 60),
            1 => "1 second".to_string(),
            s => format!("{s} seconds"),
        }
    }

    /// Validates every field, naming the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor_settings().validate()?;

        if !(0.0..=100.0).contains(&self.warn_percent) {
            return Err(ConfigError::invalid(
                "warn_percent",
                format!("{} is outside 0-100", self.warn_percent),
            ));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("data_dir", "must not be empty"));
        }

        self.listen_addr()?;

        if let Some(name) = self.log_level.as_deref() {
            if LogLevel::from_name(name).is_none() {
                return Err(ConfigError::invalid(
                    "log_level",
                    format!("unknown level '{name}' (expected off, error, warn, info, debug or trace)"),
                ));
            }
        }

        Ok(())
    }

    /// Applies CLI overrides on top of this configuration.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.interval_seconds {
            self.interval_seconds = v;
        }
        if let Some(v) = overrides.forecast_horizon {
            self.forecast_horizon = v;
        }
        if let Some(v) = overrides.history_capacity {
            self.history_capacity = v;
        }
        if let Some(v) = overrides.min_history {
            self.min_history = v;
        }
        if let Some(v) = overrides.snapshot_every {
            self.snapshot_every = v;
        }
        if let Some(v) = &overrides.data_dir {
            self.data_dir = v.clone();
        }
        if overrides.clamp_temperature {
            self.clamp_temperature = true;
        }
        if let Some(v) = overrides.warn_percent {
            self.warn_percent = v;
        }
        if let Some(v) = overrides.output {
            self.output = v;
        }
        if let Some(v) = &overrides.listen {
            self.listen = Some(v.clone());
        }
        if let Some(v) = &overrides.log_level {
            self.log_level = Some(v.clone());
        }
    }
}

/// Values supplied on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub interval_seconds: Option<u64>,
    pub forecast_horizon: Option<usize>,
    pub history_capacity: Option<usize>,
    pub min_history: Option<usize>,
    pub snapshot_every: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub clamp_temperature: bool,
    pub warn_percent: Option<f64>,
    pub output: Option<OutputFormat>,
    pub listen: Option<String>,
    pub log_level: Option<String>,
}

/// Resolves configuration from an optional file, CLI overrides, and defaults.
pub fn resolve_config(
    path: Option<&Path>,
    no_config: bool,
    overrides: &ConfigOverrides,
) -> Result<Config, ConfigError> {
    let mut config = if no_config {
        Config::default()
    } else {
        load_config(path)?
    };
    config.apply(overrides);
    Ok(config)
}

/// Candidate config files probed when no path is given, in order.
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations: Vec<PathBuf> = [
        "/etc/herakles/forecast-monitor.yaml",
        "/etc/herakles/forecast-monitor.yml",
        "/etc/herakles/forecast-monitor.json",
        "/etc/herakles/forecast-monitor.toml",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    if let Some(home) = std::env::var_os("HOME") {
        locations.push(PathBuf::from(home).join(".config/herakles/forecast-monitor.yaml"));
    }

    locations.extend(
        [
            "./herakles-forecast-monitor.yaml",
            "./herakles-forecast-monitor.yml",
            "./herakles-forecast-monitor.json",
            "./herakles-forecast-monitor.toml",
        ]
        .iter()
        .map(PathBuf::from),
    );

    locations
}

/// Loads a config file, or the first existing default location.
///
/// Returns the defaults when no file exists. An explicitly given path that
/// does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_locations().into_iter().find(|p| p.exists()) {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    let config = parse_config(&path, &content)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config content, choosing the format by file extension.
pub fn parse_config(path: &Path, content: &str) -> Result<Config, ConfigError> {
    let parse_error = |format: &'static str, detail: String| ConfigError::Parse {
        path: path.to_path_buf(),
        format,
        detail,
    };

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|e| parse_error("JSON", e.to_string())),
        Some("toml") => toml::from_str(content).map_err(|e| parse_error("TOML", e.to_string())),
        // Default to YAML
        _ => serde_yaml::from_str(content).map_err(|e| parse_error("YAML", e.to_string())),
    }
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, ConfigError> {
    match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::Render {
                format: "JSON",
                detail: e.to_string(),
            })
        }
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| ConfigError::Render {
            format: "TOML",
            detail: e.to_string(),
        }),
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| ConfigError::Render {
            format: "YAML",
            detail: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn invalid_field(config: &Config) -> &'static str {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval_seconds, 5);
        assert_eq!(config.forecast_horizon, 12);
        assert_eq!(config.history_capacity, 1000);
        assert_eq!(config.min_history, 30);
        assert_eq!(config.snapshot_every, 60);
    }

    #[test]
    fn test_invalid_fields_are_named() {
        let mut config = Config {
            interval_seconds: 0,
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "interval_seconds");

        config = Config {
            history_capacity: 0,
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "history_capacity");

        config = Config {
            min_history: 2000,
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "min_history");

        config = Config {
            snapshot_every: 0,
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "snapshot_every");

        config = Config {
            warn_percent: 120.0,
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "warn_percent");

        config = Config {
            listen: Some("not-an-address".into()),
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "listen");

        config = Config {
            data_dir: PathBuf::new(),
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "data_dir");

        config = Config {
            log_level: Some("verbose".into()),
            ..Config::default()
        };
        assert_eq!(invalid_field(&config), "log_level");
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::from_name("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_name("verbose"), None);
        assert_eq!(LogLevel::Off.as_level(), None);

        let config = Config {
            log_level: Some("Debug".into()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_horizon_is_accepted_and_labelled() {
        let config = Config {
            forecast_horizon: usize::MAX,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.horizon_label().ends_with("seconds"));
    }

    #[test]
    fn test_load_yaml_with_partial_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.yaml");
        fs::write(&path, "interval: 10\nforecast-horizon: 6\noutput: json\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.interval_seconds, 10);
        assert_eq!(config.forecast_horizon, 6);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = TempDir::new().unwrap();

        let json = dir.path().join("monitor.json");
        fs::write(&json, r#"{"min_history": 10, "listen": "127.0.0.1:9216"}"#).unwrap();
        let config = load_config(Some(&json)).unwrap();
        assert_eq!(config.min_history, 10);
        assert_eq!(config.listen.as_deref(), Some("127.0.0.1:9216"));

        let toml_path = dir.path().join("monitor.toml");
        fs::write(&toml_path, "snapshot_every = 30\nclamp_temperature = true\n").unwrap();
        let config = load_config(Some(&toml_path)).unwrap();
        assert_eq!(config.snapshot_every, 30);
        assert!(config.clamp_temperature);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = load_config(Some(&dir.path().join("absent.yaml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { format: "JSON", .. })
        ));
    }

    #[test]
    fn test_cli_overrides_win() {
        let overrides = ConfigOverrides {
            interval_seconds: Some(2),
            output: Some(OutputFormat::Log),
            clamp_temperature: true,
            ..ConfigOverrides::default()
        };
        let config = resolve_config(None, true, &overrides).unwrap();
        assert_eq!(config.interval_seconds, 2);
        assert_eq!(config.output, OutputFormat::Log);
        assert!(config.clamp_temperature);
        assert_eq!(config.forecast_horizon, DEFAULT_HORIZON);
    }

    #[test]
    fn test_horizon_label() {
        let config = Config::default();
        assert_eq!(config.horizon_label(), "1 minute");

        let config = Config {
            interval_seconds: 10,
            forecast_horizon: 30,
            ..Config::default()
        };
        assert_eq!(config.horizon_label(), "5 minutes");

        let config = Config {
            interval_seconds: 3,
            forecast_horizon: 5,
            ..Config::default()
        };
        assert_eq!(config.horizon_label(), "15 seconds");
    }

    #[test]
    fn test_render_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = render_config(&config, ConfigFormat::Yaml).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
        assert!(render_config(&config, ConfigFormat::Toml).is_ok());
        assert!(render_config(&config, ConfigFormat::Json).is_ok());
    }
}
