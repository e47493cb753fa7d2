//! CLI arguments and subcommands for herakles-forecast-monitor.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use herakles_forecast_monitor::config::{ConfigFormat, ConfigOverrides, OutputFormat};
use std::path::PathBuf;

pub use herakles_forecast_monitor::config::LogLevel;

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-forecast-monitor",
    about = "Resource telemetry monitor with short-horizon forecasting",
    long_about = "Resource telemetry monitor with short-horizon forecasting.\n\n\
                  Samples CPU, memory, disk and temperature on a fixed interval, keeps a \
                  bounded history per metric, forecasts each metric a few ticks ahead and \
                  persists the histories as snapshots so a restart resumes where it left off.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Seconds between samples
    #[arg(short = 'i', long = "interval")]
    pub interval_seconds: Option<u64>,

    /// Ticks to forecast ahead
    #[arg(long = "horizon")]
    pub forecast_horizon: Option<usize>,

    /// Samples kept per metric
    #[arg(long)]
    pub history_capacity: Option<usize>,

    /// Samples required before forecasting
    #[arg(long)]
    pub min_history: Option<usize>,

    /// Ticks between periodic snapshots
    #[arg(long)]
    pub snapshot_every: Option<u64>,

    /// Snapshot directory
    #[arg(short = 'd', long)]
    pub data_dir: Option<PathBuf>,

    /// Clamp temperature forecasts to 0-100 like percentages
    #[arg(long)]
    pub clamp_temperature: bool,

    /// Predicted CPU/memory percentage that triggers a warning
    #[arg(long)]
    pub warn_percent: Option<f64>,

    /// Observation output
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Serve Prometheus metrics on this address, e.g. 127.0.0.1:9216
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

impl Args {
    /// Config values given on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            interval_seconds: self.interval_seconds,
            forecast_horizon: self.forecast_horizon,
            history_capacity: self.history_capacity,
            min_history: self.min_history,
            snapshot_every: self.snapshot_every,
            data_dir: self.data_dir.clone(),
            clamp_temperature: self.clamp_temperature,
            warn_percent: self.warn_percent,
            output: self.output,
            listen: self.listen.clone(),
            log_level: self
                .log_level
                .and_then(|l| l.to_possible_value())
                .map(|v| v.get_name().to_string()),
        }
    }
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sampling loop until interrupted (default)
    Run,

    /// Probe every metric and print the readings
    Sample {
        /// Number of sample rounds
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print readings as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List stored snapshots
    Snapshots {
        /// Summarize only the snapshot a restart would load
        #[arg(long)]
        latest: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Validate configuration and runtime requirements
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_from_flags() {
        let args = Args::parse_from([
            "herakles-forecast-monitor",
            "--interval",
            "2",
            "--horizon",
            "6",
            "--output",
            "json",
            "--log-level",
            "debug",
            "--clamp-temperature",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.interval_seconds, Some(2));
        assert_eq!(overrides.forecast_horizon, Some(6));
        assert_eq!(overrides.output, Some(OutputFormat::Json));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert!(overrides.clamp_temperature);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_subcommands_parse() {
        let args = Args::parse_from(["herakles-forecast-monitor", "sample", "-n", "3"]);
        assert!(matches!(
            args.command,
            Some(Commands::Sample {
                iterations: 3,
                json: false
            })
        ));

        let args = Args::parse_from(["herakles-forecast-monitor", "snapshots", "--latest"]);
        assert!(matches!(args.command, Some(Commands::Snapshots { latest: true })));
    }
}
