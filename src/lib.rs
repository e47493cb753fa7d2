//! Herakles Forecast Monitor Library
//!
//! This library samples host resource metrics (CPU, memory, disk and
//! temperature) on a fixed interval, keeps a bounded history per metric,
//! forecasts each metric a few ticks ahead with a least-squares line, and
//! persists the histories as write-once snapshot files so a restarted
//! monitor resumes with its previous history.
//!
//! # Features
//!
//! - **Bounded History**: One fixed-capacity ringbuffer per metric
//! - **Linear Forecasting**: Closed-form extrapolation, clamped to valid ranges
//! - **Snapshot Persistence**: Atomic, never-overwritten JSON records
//! - **Pluggable Probes and Sinks**: `MetricProbe` and `ObservationSink` traits
//! - **Prometheus Export**: Optional `/metrics` endpoint
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_forecast_monitor::{
//!     platform_probe, Config, LogSink, Monitor, SnapshotStore,
//! };
//! use tokio::sync::watch;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! config.validate()?;
//!
//! let mut monitor = Monitor::new(
//!     config.monitor_settings(),
//!     platform_probe(),
//!     SnapshotStore::new(&config.data_dir),
//!     Box::new(LogSink::new(config.warn_percent)),
//! )?;
//!
//! let (stop_tx, stop_rx) = watch::channel(false);
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     let _ = stop_tx.send(true);
//! });
//!
//! let summary = monitor.run(stop_rx).await;
//! println!("{} ticks, {} snapshots", summary.ticks, summary.snapshots_written);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod exporter;
pub mod forecast;
pub mod metric;
pub mod monitor;
pub mod probe;
pub mod ringbuffer;
pub mod sink;
pub mod snapshot;

// Re-export main types for convenience
pub use config::{Config, ConfigError, ConfigOverrides, OutputFormat};
pub use forecast::{predict, predict_within};
pub use metric::{Metric, Reading};
pub use monitor::{Monitor, MonitorError, MonitorSettings, MonitorState, RunSummary};
pub use probe::{platform_probe, MetricProbe, ProbeError};
pub use ringbuffer::{HistoryRing, MetricRings};
pub use sink::{
    ConsoleSink, FanoutSink, JsonLinesSink, LogSink, Observation, ObservationSink, Prediction,
    Trend,
};
pub use snapshot::{Snapshot, SnapshotError, SnapshotStore};
