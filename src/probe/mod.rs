//! Metric probes.
//!
//! A probe yields one reading for one metric. The monitor is written against
//! the `MetricProbe` trait only; the platform implementation is picked once
//! at startup by `platform_probe()`.

#[cfg(not(target_os = "linux"))]
pub mod command;
#[cfg(target_os = "linux")]
pub mod procfs;

pub mod parse;

use crate::metric::Metric;

/// Errors raised by a probe for a single metric.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} is not available on this host")]
    Unavailable(Metric),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("Command '{command}' failed: {detail}")]
    Command { command: String, detail: String },
}

impl ProbeError {
    pub(crate) fn parse(what: impl Into<String>, detail: impl ToString) -> Self {
        ProbeError::Parse {
            what: what.into(),
            detail: detail.to_string(),
        }
    }
}

/// Capability that samples a single metric synchronously.
pub trait MetricProbe: Send {
    /// Returns the current value of `metric`.
    fn sample(&mut self, metric: Metric) -> Result<f64, ProbeError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Returns the probe for the platform this binary was built for.
pub fn platform_probe() -> Box<dyn MetricProbe> {
    #[cfg(target_os = "linux")]
    {
        Box::new(procfs::ProcfsProbe::new())
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(command::CommandProbe::new())
    }
}
