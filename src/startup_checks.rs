//! Startup requirement validation for herakles-forecast-monitor.
//!
//! This module validates that the monitor can persist snapshots and read its
//! metric sources before the sampling loop starts.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(data_dir: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_data_dir(data_dir)?;
    check_probe_sources()?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check that the snapshot directory exists (or can be created) and is writable
pub fn check_data_dir(data_dir: &Path) -> Result<(), ValidationError> {
    fs::create_dir_all(data_dir).map_err(|e| {
        error!("❌ Cannot create data directory {}: {}", data_dir.display(), e);
        ValidationError::DataDirNotWritable {
            path: data_dir.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    // A real write, since directory permission bits do not cover read-only mounts
    let probe = tempfile::Builder::new()
        .prefix(".write-check-")
        .tempfile_in(data_dir)
        .and_then(|mut file| file.write_all(b"ok").map(|_| file));

    match probe {
        Ok(_) => {
            info!("✅ Data directory writable: {}", data_dir.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ Data directory {} is not writable: {}", data_dir.display(), e);
            error!("   Snapshots cannot be saved; history will be lost on restart");
            Err(ValidationError::DataDirNotWritable {
                path: data_dir.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }
}

/// Check that the files the platform probe reads are present
#[cfg(target_os = "linux")]
pub fn check_probe_sources() -> Result<(), ValidationError> {
    for source in ["/proc/stat", "/proc/meminfo"] {
        if let Err(e) = fs::metadata(source) {
            error!("❌ Cannot access {}: {}", source, e);
            return Err(ValidationError::ProbeSourceUnavailable(format!("{source}: {e}")));
        }
        debug!("Probe source available: {}", source);
    }

    let thermal = Path::new("/sys/class/thermal/thermal_zone0/temp");
    if thermal.exists() || Path::new("/sys/class/hwmon").exists() {
        info!("✅ Temperature sensors available");
    } else {
        warn!("⚠️  No thermal zone or hwmon sensors found - temperature will be reported as unavailable");
    }

    info!("✅ Probe sources readable");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn check_probe_sources() -> Result<(), ValidationError> {
    for tool in ["top", "vm_stat", "df"] {
        if which::which(tool).is_err() {
            error!("❌ Required tool '{}' not found in PATH", tool);
            return Err(ValidationError::ProbeSourceUnavailable(tool.to_string()));
        }
        debug!("Probe tool available: {}", tool);
    }

    if which::which("osx-cpu-temp").is_err() {
        warn!("⚠️  'osx-cpu-temp' not found - temperature will be reported as unavailable");
    }

    info!("✅ Probe tools available");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Data directory {path:?} is not writable: {reason}")]
    DataDirNotWritable { path: PathBuf, reason: String },

    #[error("Probe source unavailable: {0}")]
    ProbeSourceUnavailable(String),
}
