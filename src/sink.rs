//! Observation records and the sinks that consume them.
//!
//! Every tick the monitor emits one `Observation` with the current readings
//! and, once enough history exists, the forecasts. Sinks are presentation:
//! the console renderer, a JSON-lines writer, structured log events, or the
//! Prometheus exporter in `crate::exporter`.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::Write;
use tracing::{info, warn};

use crate::metric::Metric;

/// Direction of a forecast relative to the current reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "↑",
            Trend::Down => "↓",
        }
    }
}

/// A forecast for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub value: f64,
    /// `None` when the metric has no reading this tick to compare against.
    pub trend: Option<Trend>,
}

/// A predicted value crossing the warning threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub metric: Metric,
    pub predicted: f64,
    pub threshold: f64,
}

impl Alert {
    pub fn message(&self) -> &'static str {
        match self.metric {
            Metric::Cpu => "High CPU usage predicted. Consider closing intensive applications.",
            Metric::Memory => {
                "High memory usage predicted. Check for memory leaks or close applications."
            }
            Metric::Disk => "High disk usage predicted. Free up space on the root filesystem.",
            Metric::Temperature => "High temperature predicted. Check cooling.",
        }
    }
}

/// Structured record emitted once per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub tick: u64,
    pub readings: BTreeMap<Metric, Option<f64>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub predictions: BTreeMap<Metric, Prediction>,
    pub history_samples: BTreeMap<Metric, usize>,
}

impl Observation {
    pub fn reading(&self, metric: Metric) -> Option<f64> {
        self.readings.get(&metric).copied().flatten()
    }

    pub fn prediction(&self, metric: Metric) -> Option<f64> {
        self.predictions.get(&metric).map(|p| p.value)
    }

    /// Predictions of CPU and memory above `threshold` percent.
    pub fn alerts(&self, threshold: f64) -> Vec<Alert> {
        [Metric::Cpu, Metric::Memory]
            .into_iter()
            .filter_map(|metric| {
                let predicted = self.prediction(metric)?;
                (predicted > threshold).then_some(Alert {
                    metric,
                    predicted,
                    threshold,
                })
            })
            .collect()
    }
}

/// Consumer of observations and non-fatal warnings.
pub trait ObservationSink: Send {
    fn observe(&mut self, observation: &Observation);

    /// Reports a recovered failure such as a snapshot write error.
    fn warn(&mut self, message: &str) {
        warn!("⚠️  {}", message);
    }
}

/// Renders a full status screen per tick, like `top`.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    clear_screen: bool,
    horizon_label: String,
    warn_percent: f64,
}

impl ConsoleSink<std::io::Stdout> {
    /// Console sink writing to stdout and clearing the screen each tick.
    pub fn stdout(horizon_label: impl Into<String>, warn_percent: f64) -> Self {
        Self::new(std::io::stdout(), true, horizon_label, warn_percent)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(
        out: W,
        clear_screen: bool,
        horizon_label: impl Into<String>,
        warn_percent: f64,
    ) -> Self {
        Self {
            out,
            clear_screen,
            horizon_label: horizon_label.into(),
            warn_percent,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Renders the status screen for one observation.
pub fn render_status(observation: &Observation, horizon_label: &str, warn_percent: f64) -> String {
    let mut out = String::new();
    let local: DateTime<Local> = observation.timestamp.into();

    let _ = writeln!(out, "=== HERAKLES FORECAST MONITOR ===");
    let _ = writeln!(out, "Time: {}", local.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);
    let _ = writeln!(out, "--- CURRENT STATUS ---");
    for metric in Metric::ALL {
        let label = format!("{}:", metric_label(metric));
        match observation.reading(metric) {
            Some(value) => {
                let _ = writeln!(out, "{label:<15}{value:.1}{}", metric.unit());
            }
            None => {
                let _ = writeln!(out, "{label:<15}Not available");
            }
        }
    }

    if !observation.predictions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- PREDICTIONS ({horizon_label} ahead) ---");
        for (metric, prediction) in &observation.predictions {
            let label = format!("{}:", metric_label(*metric));
            let arrow = prediction.trend.map(Trend::arrow).unwrap_or("");
            let _ = writeln!(
                out,
                "{label:<15}{:.1}{} {arrow}",
                prediction.value,
                metric.unit()
            );
        }

        for alert in observation.alerts(warn_percent) {
            let _ = writeln!(out);
            let _ = writeln!(out, "WARNING: {}", alert.message());
        }
    }

    out
}

fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Cpu => "CPU Usage",
        Metric::Memory => "Memory Usage",
        Metric::Disk => "Disk Usage",
        Metric::Temperature => "Temperature",
    }
}

impl<W: Write + Send> ObservationSink for ConsoleSink<W> {
    fn observe(&mut self, observation: &Observation) {
        let screen = render_status(observation, &self.horizon_label, self.warn_percent);
        let clear = if self.clear_screen { "\x1B[2J\x1B[H" } else { "" };
        if let Err(e) = write!(self.out, "{clear}{screen}").and_then(|_| self.out.flush()) {
            warn!("Failed to write status: {}", e);
        }
    }

    fn warn(&mut self, message: &str) {
        warn!("⚠️  {}", message);
        let _ = writeln!(self.out, "WARNING: {message}");
    }
}

/// Writes one JSON object per observation.
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ObservationSink for JsonLinesSink<W> {
    fn observe(&mut self, observation: &Observation) {
        let result = serde_json::to_writer(&mut self.out, observation)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!("Failed to write observation: {}", e);
        }
    }
}

/// Emits each observation as a structured log event.
#[derive(Debug, Default)]
pub struct LogSink {
    warn_percent: f64,
}

impl LogSink {
    pub fn new(warn_percent: f64) -> Self {
        Self { warn_percent }
    }
}

impl ObservationSink for LogSink {
    fn observe(&mut self, observation: &Observation) {
        info!(
            tick = observation.tick,
            cpu = ?observation.reading(Metric::Cpu),
            memory = ?observation.reading(Metric::Memory),
            disk = ?observation.reading(Metric::Disk),
            temperature = ?observation.reading(Metric::Temperature),
            cpu_forecast = ?observation.prediction(Metric::Cpu),
            memory_forecast = ?observation.prediction(Metric::Memory),
            disk_forecast = ?observation.prediction(Metric::Disk),
            temperature_forecast = ?observation.prediction(Metric::Temperature),
            "Observation"
        );
        for alert in observation.alerts(self.warn_percent) {
            warn!(
                metric = %alert.metric,
                predicted = alert.predicted,
                "⚠️  {}",
                alert.message()
            );
        }
    }
}

/// Forwards everything to several sinks in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn ObservationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn ObservationSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ObservationSink for FanoutSink {
    fn observe(&mut self, observation: &Observation) {
        for sink in &mut self.sinks {
            sink.observe(observation);
        }
    }

    fn warn(&mut self, message: &str) {
        for sink in &mut self.sinks {
            sink.warn(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(with_predictions: bool) -> Observation {
        let mut readings = BTreeMap::new();
        readings.insert(Metric::Cpu, Some(42.0));
        readings.insert(Metric::Memory, Some(80.0));
        readings.insert(Metric::Disk, Some(55.5));
        readings.insert(Metric::Temperature, None);

        let mut predictions = BTreeMap::new();
        if with_predictions {
            predictions.insert(
                Metric::Cpu,
                Prediction {
                    value: 30.0,
                    trend: Some(Trend::Down),
                },
            );
            predictions.insert(
                Metric::Memory,
                Prediction {
                    value: 95.0,
                    trend: Some(Trend::Up),
                },
            );
        }

        Observation {
            timestamp: Utc::now(),
            tick: 7,
            readings,
            predictions,
            history_samples: BTreeMap::new(),
        }
    }

    #[test]
    fn test_alerts_only_above_threshold() {
        let alerts = observation(true).alerts(90.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, Metric::Memory);
        assert!(observation(false).alerts(90.0).is_empty());
    }

    #[test]
    fn test_render_without_predictions() {
        let screen = render_status(&observation(false), "1 minute", 90.0);
        assert!(screen.contains("CPU Usage:     42.0%"));
        assert!(screen.contains("Temperature:   Not available"));
        assert!(!screen.contains("PREDICTIONS"));
    }

    #[test]
    fn test_render_with_predictions_and_warning() {
        let screen = render_status(&observation(true), "1 minute", 90.0);
        assert!(screen.contains("--- PREDICTIONS (1 minute ahead) ---"));
        assert!(screen.contains("Memory Usage:  95.0% ↑"));
        assert!(screen.contains("CPU Usage:     30.0% ↓"));
        assert!(screen.contains("WARNING: High memory usage predicted"));
    }

    #[test]
    fn test_console_sink_writes_without_clearing() {
        let mut sink = ConsoleSink::new(Vec::new(), false, "1 minute", 90.0);
        sink.observe(&observation(false));
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert!(written.starts_with("=== HERAKLES FORECAST MONITOR ==="));
    }

    #[test]
    fn test_json_lines_omit_empty_predictions() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.observe(&observation(false));
        sink.observe(&observation(true));
        let written = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert!(first.get("predictions").is_none());
        assert_eq!(first["readings"]["temperature"], serde_json::Value::Null);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["predictions"]["memory"]["trend"], "up");
    }
}
