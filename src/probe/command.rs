//! Command-based probe for hosts without procfs (macOS and other Unixes).
//!
//! Runs `top`, `vm_stat`, `df` and `osx-cpu-temp` and parses their output.

use std::process::Command;

use super::parse::{
    parse_df_percent, parse_osx_cpu_temp, parse_top_cpu_percent, parse_vm_stat_used_percent,
};
use super::{MetricProbe, ProbeError};
use crate::metric::Metric;

/// Probe that shells out to standard system tools.
#[derive(Debug, Default)]
pub struct CommandProbe;

impl CommandProbe {
    pub fn new() -> Self {
        Self
    }
}

impl MetricProbe for CommandProbe {
    fn sample(&mut self, metric: Metric) -> Result<f64, ProbeError> {
        match metric {
            Metric::Cpu => parse_top_cpu_percent(&run("top", &["-l", "1", "-n", "0"])?),
            Metric::Memory => parse_vm_stat_used_percent(&run("vm_stat", &[])?),
            Metric::Disk => parse_df_percent(&run("df", &["-k", "/"])?),
            Metric::Temperature => run("osx-cpu-temp", &[])
                .and_then(|output| parse_osx_cpu_temp(&output))
                .map_err(|_| ProbeError::Unavailable(Metric::Temperature)),
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

fn run(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ProbeError::Command {
            command: program.to_string(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ProbeError::Command {
            command: program.to_string(),
            detail: format!("exited with {}", output.status),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
