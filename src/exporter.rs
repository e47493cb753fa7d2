//! Prometheus exporter for readings and forecasts.
//!
//! `PrometheusSink` mirrors every observation into gauges. The HTTP server
//! only reads the registry, so it never touches the monitor's histories.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Counter, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::metric::Metric;
use crate::sink::{Observation, ObservationSink};

/// Collection of exported forecast metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    pub reading: GaugeVec,         // labels: metric
    pub prediction: GaugeVec,      // labels: metric
    pub history_samples: GaugeVec, // labels: metric
    pub ticks_total: Counter,
    pub warnings_total: Counter,
}

impl ForecastMetrics {
    /// Creates and registers all metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let reading = GaugeVec::new(
            Opts::new(
                "herakles_forecast_reading",
                "Latest reading per metric (percent, temperature in Celsius)",
            ),
            &["metric"],
        )?;
        let prediction = GaugeVec::new(
            Opts::new(
                "herakles_forecast_prediction",
                "Forecast value per metric at the configured horizon",
            ),
            &["metric"],
        )?;
        let history_samples = GaugeVec::new(
            Opts::new(
                "herakles_forecast_history_samples",
                "Number of samples held in the history ring per metric",
            ),
            &["metric"],
        )?;
        let ticks_total = Counter::new(
            "herakles_forecast_ticks_total",
            "Number of sampling ticks completed",
        )?;
        let warnings_total = Counter::new(
            "herakles_forecast_warnings_total",
            "Number of recovered failures reported by the monitor",
        )?;

        registry.register(Box::new(reading.clone()))?;
        registry.register(Box::new(prediction.clone()))?;
        registry.register(Box::new(history_samples.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(warnings_total.clone()))?;

        Ok(Self {
            reading,
            prediction,
            history_samples,
            ticks_total,
            warnings_total,
        })
    }
}

/// Sink updating Prometheus gauges from observations.
pub struct PrometheusSink {
    metrics: ForecastMetrics,
}

impl PrometheusSink {
    pub fn new(metrics: ForecastMetrics) -> Self {
        Self { metrics }
    }
}

impl ObservationSink for PrometheusSink {
    fn observe(&mut self, observation: &Observation) {
        for metric in Metric::ALL {
            let label = [metric.name()];
            match observation.reading(metric) {
                Some(value) => self.metrics.reading.with_label_values(&label).set(value),
                None => {
                    // Absent series rather than a stale value
                    let _ = self.metrics.reading.remove_label_values(&label);
                }
            }
            match observation.prediction(metric) {
                Some(value) => self.metrics.prediction.with_label_values(&label).set(value),
                None => {
                    let _ = self.metrics.prediction.remove_label_values(&label);
                }
            }
            if let Some(&samples) = observation.history_samples.get(&metric) {
                self.metrics
                    .history_samples
                    .with_label_values(&label)
                    .set(samples as f64);
            }
        }
        self.metrics.ticks_total.inc();
    }

    fn warn(&mut self, message: &str) {
        tracing::warn!("⚠️  {}", message);
        self.metrics.warnings_total.inc();
    }
}

/// Encodes the registry in the Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> Result<String, String> {
    let families = registry.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {e}"))?;
    String::from_utf8(buffer).map_err(|e| format!("Metrics are not UTF-8: {e}"))
}

async fn metrics_handler(State(registry): State<Registry>) -> impl IntoResponse {
    debug!("Processing /metrics request");
    match encode_metrics(&registry) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK\n")
}

/// Builds the exporter routes.
pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(registry)
}

/// Serves `/metrics` and `/health` until `shutdown` turns true.
pub async fn serve(
    addr: SocketAddr,
    registry: Registry,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Exporter listening on http://{}", addr);

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            debug!("Exporter shutting down");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn observation(temperature: Option<f64>) -> Observation {
        let mut readings = BTreeMap::new();
        readings.insert(Metric::Cpu, Some(12.0));
        readings.insert(Metric::Memory, Some(40.0));
        readings.insert(Metric::Disk, Some(70.0));
        readings.insert(Metric::Temperature, temperature);

        let mut history_samples = BTreeMap::new();
        history_samples.insert(Metric::Cpu, 31);

        Observation {
            timestamp: Utc::now(),
            tick: 1,
            readings,
            predictions: BTreeMap::new(),
            history_samples,
        }
    }

    #[test]
    fn test_sink_exports_readings() {
        let registry = Registry::new();
        let mut sink = PrometheusSink::new(ForecastMetrics::new(&registry).unwrap());

        sink.observe(&observation(Some(48.0)));
        let text = encode_metrics(&registry).unwrap();

        assert!(text.contains("herakles_forecast_reading{metric=\"cpu\"} 12"));
        assert!(text.contains("herakles_forecast_reading{metric=\"temperature\"} 48"));
        assert!(text.contains("herakles_forecast_history_samples{metric=\"cpu\"} 31"));
        assert!(text.contains("herakles_forecast_ticks_total 1"));
    }

    #[test]
    fn test_unavailable_reading_removes_series() {
        let registry = Registry::new();
        let mut sink = PrometheusSink::new(ForecastMetrics::new(&registry).unwrap());

        sink.observe(&observation(Some(48.0)));
        sink.observe(&observation(None));
        let text = encode_metrics(&registry).unwrap();

        assert!(!text.contains("metric=\"temperature\""));
        assert!(text.contains("herakles_forecast_ticks_total 2"));
    }

    #[test]
    fn test_warnings_are_counted() {
        let registry = Registry::new();
        let mut sink = PrometheusSink::new(ForecastMetrics::new(&registry).unwrap());
        sink.warn("snapshot failed");
        let text = encode_metrics(&registry).unwrap();
        assert!(text.contains("herakles_forecast_warnings_total 1"));
    }
}
