//! CLI command implementations for herakles-forecast-monitor.
//!
//! This module provides implementations for the CLI subcommands:
//! - `sample`: Probe every metric and print the readings
//! - `snapshots`: List stored snapshots
//! - `config`: Configuration file generation
//! - `check`: Configuration and runtime requirement validation
//!
//! `run` is the sampling loop itself and lives in `main`.

pub mod check;
pub mod config;
pub mod sample;
pub mod snapshots;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use sample::command_sample;
pub use snapshots::command_snapshots;
