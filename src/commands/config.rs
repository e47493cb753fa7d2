//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;

use herakles_forecast_monitor::config::{render_config, Config, ConfigFormat};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from(match format {
            ConfigFormat::Yaml => "herakles-forecast-monitor.yaml",
            ConfigFormat::Json => "herakles-forecast-monitor.json",
            ConfigFormat::Toml => "herakles-forecast-monitor.toml",
        }),
    };

    let mut content = render_config(&config, format)?;
    if commented && format == ConfigFormat::Yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Forecast Monitor Configuration
# =======================================
#
# Sampling
# --------
# interval_seconds: 5          # Seconds between ticks
# forecast_horizon: 12         # Ticks to forecast ahead (12 x 5s = 1 minute)
# history_capacity: 1000       # Samples kept per metric
# min_history: 30              # Samples required before forecasting
#
# Persistence
# -----------
# snapshot_every: 60           # Ticks between periodic snapshots
# data_dir: "~/.local/share/herakles/forecast-monitor"
#                              # Snapshots accumulate here; nothing is pruned
#
# Forecasting
# -----------
# clamp_temperature: false     # Clamp temperature forecasts to 0-100 like percentages
# warn_percent: 90.0           # Warn when predicted CPU/memory exceeds this
#
# Output
# ------
# output: console              # console, json, log
# listen: null                 # Prometheus exporter address, e.g. "127.0.0.1:9216"
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.yaml");

        command_config(Some(path.clone()), ConfigFormat::Yaml, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Herakles Forecast Monitor Configuration"));
        let loaded = herakles_forecast_monitor::config::load_config(Some(&path)).unwrap();
        assert_eq!(loaded, Config::default());
    }
}
