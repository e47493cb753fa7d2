//! The sampling loop and its run/stop state machine.
//!
//! A `Monitor` is constructed explicitly by the entry point and owns the
//! history rings, the probe, the snapshot store, and the observation sink.
//! Ticks are strictly serialized: `run` executes one tick, then waits for the
//! next interval boundary or a stop request, whichever comes first.
//!
//! ```text
//! Initializing --initialize()--> Running --stop()--> Stopping --> Stopped
//! ```
//!
//! A stop request is a `watch::Receiver<bool>` turning true. It is observed at
//! tick boundaries only, so an in-flight snapshot save always completes.

use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::config::ConfigError;
use crate::forecast::predict_within;
use crate::metric::Metric;
use crate::probe::MetricProbe;
use crate::ringbuffer::MetricRings;
use crate::sink::{Observation, ObservationSink, Prediction, Trend};
use crate::snapshot::SnapshotStore;

/// Lifecycle state of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Initializing,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Initializing => "initializing",
            MonitorState::Running => "running",
            MonitorState::Stopping => "stopping",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Errors returned by the monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Invalid monitor configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Monitor is {0}, not running")]
    NotRunning(MonitorState),
}

/// Numeric settings of the sampling loop. Fixed for the life of a monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub interval: Duration,
    /// Ticks ahead to forecast
    pub horizon: usize,
    pub history_capacity: usize,
    /// Samples a ring must hold before its metric is forecast
    pub min_history: usize,
    /// Ticks between periodic snapshots
    pub snapshot_every: u64,
    pub clamp_temperature: bool,
}

impl MonitorSettings {
    /// Checks every setting, naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::invalid(
                "interval_seconds",
                "must be greater than 0",
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::invalid(
                "history_capacity",
                "must be greater than 0",
            ));
        }
        if self.min_history == 0 || self.min_history > self.history_capacity {
            return Err(ConfigError::invalid(
                "min_history",
                format!(
                    "must be between 1 and history_capacity ({}), got {}",
                    self.history_capacity, self.min_history
                ),
            ));
        }
        if self.snapshot_every == 0 {
            return Err(ConfigError::invalid(
                "snapshot_every",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub snapshots_written: u64,
    pub snapshot_failures: u64,
}

/// The sampling loop.
pub struct Monitor {
    settings: MonitorSettings,
    probe: Box<dyn MetricProbe>,
    store: SnapshotStore,
    sink: Box<dyn ObservationSink>,
    rings: MetricRings,
    state: MonitorState,
    tick_count: u64,
    snapshots_written: u64,
    snapshot_failures: u64,
}

impl Monitor {
    /// Creates a monitor in the `Initializing` state.
    ///
    /// Invalid settings are rejected here, so a monitor that exists can
    /// always enter `Running`.
    pub fn new(
        settings: MonitorSettings,
        probe: Box<dyn MetricProbe>,
        store: SnapshotStore,
        sink: Box<dyn ObservationSink>,
    ) -> Result<Self, MonitorError> {
        settings.validate()?;
        let rings = MetricRings::new(settings.history_capacity);

        Ok(Self {
            settings,
            probe,
            store,
            sink,
            rings,
            state: MonitorState::Initializing,
            tick_count: 0,
            snapshots_written: 0,
            snapshot_failures: 0,
        })
    }

    /// Seeds the rings from the newest snapshot and enters `Running`.
    ///
    /// A missing or corrupt snapshot leaves the rings empty. Calling this
    /// outside `Initializing` has no effect.
    pub fn initialize(&mut self) {
        if self.state != MonitorState::Initializing {
            return;
        }

        match self.store.load_latest() {
            Some(snapshot) => {
                let restored = self.rings.restore(&snapshot.histories);
                info!(
                    "Restored {} samples from snapshot created at {}",
                    restored, snapshot.created_at
                );
            }
            None => info!("No snapshot found, starting with empty history"),
        }

        info!(
            probe = self.probe.name(),
            interval_secs = self.settings.interval.as_secs_f64(),
            horizon = self.settings.horizon,
            "Monitor running"
        );
        self.state = MonitorState::Running;
    }

    /// Performs one tick: sample, append, forecast, emit, and maybe save.
    #[instrument(level = "debug", skip_all, fields(tick = self.tick_count + 1))]
    pub fn tick(&mut self) -> Result<Observation, MonitorError> {
        if self.state != MonitorState::Running {
            return Err(MonitorError::NotRunning(self.state));
        }

        let timestamp = Utc::now();

        let mut readings = BTreeMap::new();
        for metric in Metric::ALL {
            let value = self.sample(metric);
            if let Some(v) = value {
                self.rings.record(metric, v);
            }
            readings.insert(metric, value);
        }

        // All appends of this tick are done before any forecast runs
        let mut predictions = BTreeMap::new();
        for metric in Metric::ALL {
            if self.rings.size(metric) < self.settings.min_history {
                continue;
            }
            let history = self.rings.history(metric);
            let value = predict_within(
                &history,
                self.settings.horizon,
                metric.forecast_bounds(self.settings.clamp_temperature),
            );
            let trend = readings
                .get(&metric)
                .copied()
                .flatten()
                .map(|current| if value > current { Trend::Up } else { Trend::Down });
            predictions.insert(metric, Prediction { value, trend });
        }

        self.tick_count += 1;

        let history_samples = Metric::ALL
            .iter()
            .map(|&metric| (metric, self.rings.size(metric)))
            .collect();

        let observation = Observation {
            timestamp,
            tick: self.tick_count,
            readings,
            predictions,
            history_samples,
        };
        self.sink.observe(&observation);

        if self.tick_count % self.settings.snapshot_every == 0 {
            self.save_snapshot();
        }

        Ok(observation)
    }

    /// Runs ticks until `shutdown` turns true, then stops.
    ///
    /// A dropped sender is treated as "never stop".
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        self.initialize();

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately
        ticker.tick().await;

        while self.state == MonitorState::Running {
            if *shutdown.borrow_and_update() {
                info!("Stop requested");
                break;
            }

            if let Err(e) = self.tick() {
                warn!("Tick skipped: {}", e);
                break;
            }

            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => {
                    info!("Stop requested");
                    break;
                }
                _ = ticker.tick() => {}
            }
        }

        self.stop();
        self.summary()
    }

    /// Saves a final snapshot and enters `Stopped`. Idempotent.
    pub fn stop(&mut self) {
        match self.state {
            MonitorState::Stopping | MonitorState::Stopped => return,
            MonitorState::Initializing => {
                // Nothing sampled and nothing restored worth re-saving
                self.state = MonitorState::Stopped;
                return;
            }
            MonitorState::Running => {}
        }

        self.state = MonitorState::Stopping;
        info!("Saving final snapshot");
        self.save_snapshot();
        self.state = MonitorState::Stopped;
        info!(
            ticks = self.tick_count,
            snapshots = self.snapshots_written,
            failures = self.snapshot_failures,
            "Monitor stopped"
        );
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Copy of one metric's history, oldest first.
    pub fn history(&self, metric: Metric) -> Vec<f64> {
        self.rings.history(metric)
    }

    pub fn ring_size(&self, metric: Metric) -> usize {
        self.rings.size(metric)
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.tick_count,
            snapshots_written: self.snapshots_written,
            snapshot_failures: self.snapshot_failures,
        }
    }

    fn sample(&mut self, metric: Metric) -> Option<f64> {
        match self.probe.sample(metric) {
            Ok(value) if value.is_finite() => Some(value),
            Ok(value) => {
                warn!(%metric, value, "Probe returned a non-finite value, treating as unavailable");
                None
            }
            Err(e) if metric.may_be_absent() => {
                debug!(%metric, "Reading unavailable: {}", e);
                None
            }
            Err(e) => {
                warn!(%metric, "Reading unavailable this tick: {}", e);
                None
            }
        }
    }

    fn save_snapshot(&mut self) {
        let histories = self.rings.snapshot_all();
        match self.store.save(&histories, Utc::now()) {
            Ok(path) => {
                debug!("Snapshot written: {}", path.display());
                self.snapshots_written += 1;
            }
            Err(e) => {
                self.snapshot_failures += 1;
                self.sink.warn(&format!("Failed to save snapshot: {e}"));
            }
        }
    }
}

async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MonitorSettings {
        MonitorSettings {
            interval: Duration::from_secs(5),
            horizon: 12,
            history_capacity: 1000,
            min_history: 30,
            snapshot_every: 60,
            clamp_temperature: false,
        }
    }

    fn field_of(settings: MonitorSettings) -> &'static str {
        match settings.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected invalid settings, got {other:?}"),
        }
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_name_the_field() {
        assert_eq!(
            field_of(MonitorSettings {
                interval: Duration::ZERO,
                ..settings()
            }),
            "interval_seconds"
        );
        assert_eq!(
            field_of(MonitorSettings {
                history_capacity: 0,
                min_history: 0,
                ..settings()
            }),
            "history_capacity"
        );
        assert_eq!(
            field_of(MonitorSettings {
                min_history: 0,
                ..settings()
            }),
            "min_history"
        );
        assert_eq!(
            field_of(MonitorSettings {
                snapshot_every: 0,
                ..settings()
            }),
            "snapshot_every"
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(MonitorState::Running.to_string(), "running");
        assert_eq!(MonitorState::Stopped.to_string(), "stopped");
    }
}
