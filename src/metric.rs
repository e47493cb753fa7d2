//! Metric identifiers and readings.
//!
//! The monitor samples a fixed set of four metrics. Three of them are
//! percentages and always carry a value; temperature is a Celsius value and
//! may be legitimately absent on hardware without a readable sensor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower and upper bound for percentage metrics.
pub const PERCENT_BOUNDS: (f64, f64) = (0.0, 100.0);

/// A sampled system metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
    Temperature,
}

impl Metric {
    /// All metrics in sampling order.
    pub const ALL: [Metric; 4] = [
        Metric::Cpu,
        Metric::Memory,
        Metric::Disk,
        Metric::Temperature,
    ];

    /// Stable lowercase name used in snapshots, logs and metric labels.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
            Metric::Temperature => "temperature",
        }
    }

    /// Display unit for rendered values.
    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            _ => "%",
        }
    }

    /// Whether an unavailable reading is expected rather than a fault.
    pub fn may_be_absent(self) -> bool {
        matches!(self, Metric::Temperature)
    }

    /// Bounds applied to forecasts of this metric.
    ///
    /// Percentages are clamped to `[0, 100]`. Temperature is unbounded unless
    /// `clamp_temperature` asks for the shared percentage clamp.
    pub fn forecast_bounds(self, clamp_temperature: bool) -> Option<(f64, f64)> {
        match self {
            Metric::Temperature if !clamp_temperature => None,
            _ => Some(PERCENT_BOUNDS),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One metric's value captured during a tick, or the unavailable marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub metric: Metric,
    pub value: Option<f64>,
}

impl Reading {
    pub fn observed(metric: Metric, value: f64) -> Self {
        Self {
            metric,
            value: Some(value),
        }
    }

    pub fn unavailable(metric: Metric) -> Self {
        Self {
            metric,
            value: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }
}
