//! Linux probe reading /proc, /sys and statvfs.
//!
//! - CPU: busy share of /proc/stat time since the previous sample
//! - Memory: `MemTotal - MemAvailable` from /proc/meminfo
//! - Disk: used share of the root filesystem via statvfs
//! - Temperature: first readable thermal zone, then hwmon sensors

use std::ffi::CString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::parse::{parse_meminfo_used_percent, parse_millidegrees, parse_proc_stat, CpuStat};
use super::{MetricProbe, ProbeError};
use crate::metric::Metric;

/// Probe backed by the Linux proc and sys filesystems.
pub struct ProcfsProbe {
    proc_root: PathBuf,
    sys_root: PathBuf,
    disk_path: String,
    previous_cpu: Option<CpuStat>,
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsProbe {
    pub fn new() -> Self {
        Self::with_roots("/proc", "/sys", "/")
    }

    /// Creates a probe reading from alternative roots.
    pub fn with_roots(
        proc_root: impl Into<PathBuf>,
        sys_root: impl Into<PathBuf>,
        disk_path: impl Into<String>,
    ) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
            disk_path: disk_path.into(),
            previous_cpu: None,
        }
    }

    fn cpu_percent(&mut self) -> Result<f64, ProbeError> {
        let current = parse_proc_stat(&read(&self.proc_root.join("stat"))?)?;

        // The first sample has no baseline and reports the share since boot.
        let baseline = self.previous_cpu.replace(current).unwrap_or_default();
        current
            .usage_percent_since(&baseline)
            .ok_or_else(|| ProbeError::parse("/proc/stat", "no CPU time elapsed"))
    }

    fn memory_percent(&self) -> Result<f64, ProbeError> {
        parse_meminfo_used_percent(&read(&self.proc_root.join("meminfo"))?)
    }

    fn disk_percent(&self) -> Result<f64, ProbeError> {
        statvfs_used_percent(&self.disk_path)
    }

    fn temperature_celsius(&self) -> Result<f64, ProbeError> {
        let zone = self.sys_root.join("class/thermal/thermal_zone0/temp");
        if let Ok(content) = fs::read_to_string(&zone) {
            return parse_millidegrees(&content);
        }

        read_first_hwmon_temp(&self.sys_root.join("class/hwmon"))
            .ok_or(ProbeError::Unavailable(Metric::Temperature))
    }
}

impl MetricProbe for ProcfsProbe {
    fn sample(&mut self, metric: Metric) -> Result<f64, ProbeError> {
        match metric {
            Metric::Cpu => self.cpu_percent(),
            Metric::Memory => self.memory_percent(),
            Metric::Disk => self.disk_percent(),
            Metric::Temperature => self.temperature_celsius(),
        }
    }

    fn name(&self) -> &'static str {
        "procfs"
    }
}

fn read(path: &Path) -> Result<String, ProbeError> {
    fs::read_to_string(path).map_err(|source| ProbeError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Reads the first `temp*_input` of any hwmon device.
fn read_first_hwmon_temp(hwmon_base: &Path) -> Option<f64> {
    let mut devices: Vec<PathBuf> = fs::read_dir(hwmon_base)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .collect();
    devices.sort();

    for device in devices {
        let mut inputs: Vec<PathBuf> = match fs::read_dir(&device) {
            Ok(entries) => entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.file_name()
                        .map(|n| n.to_string_lossy())
                        .is_some_and(|n| n.starts_with("temp") && n.ends_with("_input"))
                })
                .collect(),
            Err(_) => continue,
        };
        inputs.sort();

        for input in inputs {
            if let Some(celsius) = fs::read_to_string(&input)
                .ok()
                .and_then(|content| parse_millidegrees(&content).ok())
            {
                debug!("Temperature read from {}", input.display());
                return Some(celsius);
            }
        }
    }

    None
}

/// Used share of the filesystem holding `path`, as `df` reports it.
fn statvfs_used_percent(path: &str) -> Result<f64, ProbeError> {
    use std::mem;

    let c_path = CString::new(path).map_err(|e| ProbeError::parse("disk path", e))?;

    // SAFETY: statvfs is a plain C struct valid when zeroed; c_path is a
    // NUL-terminated string that outlives the call.
    let stat = unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(ProbeError::Io {
                path: path.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }
        stat
    };

    let block_size = stat.f_frsize as u64;
    let used = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64) * block_size;
    let available = stat.f_bavail as u64 * block_size;

    if used + available == 0 {
        return Err(ProbeError::parse("statvfs", format!("{path} reports no blocks")));
    }
    Ok(used as f64 / (used + available) as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_roots() -> TempDir {
        let dir = TempDir::new().unwrap();
        let proc_root = dir.path().join("proc");
        fs::create_dir_all(&proc_root).unwrap();
        fs::write(
            proc_root.join("stat"),
            "cpu  100 0 0 100 0 0 0 0 0 0\n",
        )
        .unwrap();
        fs::write(
            proc_root.join("meminfo"),
            "MemTotal: 1000 kB\nMemAvailable: 250 kB\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_cpu_uses_delta_between_samples() {
        let dir = fake_roots();
        let proc_root = dir.path().join("proc");
        let mut probe = ProcfsProbe::with_roots(&proc_root, dir.path().join("sys"), "/");

        // First sample: share since boot
        let first = probe.sample(Metric::Cpu).unwrap();
        assert!((first - 50.0).abs() < 1e-9);

        fs::write(proc_root.join("stat"), "cpu  190 0 0 110 0 0 0 0 0 0\n").unwrap();
        let second = probe.sample(Metric::Cpu).unwrap();
        assert!((second - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_memory_from_meminfo() {
        let dir = fake_roots();
        let mut probe =
            ProcfsProbe::with_roots(dir.path().join("proc"), dir.path().join("sys"), "/");
        let used = probe.sample(Metric::Memory).unwrap();
        assert!((used - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_from_thermal_zone() {
        let dir = fake_roots();
        let zone = dir.path().join("sys/class/thermal/thermal_zone0");
        fs::create_dir_all(&zone).unwrap();
        fs::write(zone.join("temp"), "52000\n").unwrap();

        let mut probe =
            ProcfsProbe::with_roots(dir.path().join("proc"), dir.path().join("sys"), "/");
        assert_eq!(probe.sample(Metric::Temperature).unwrap(), 52.0);
    }

    #[test]
    fn test_temperature_falls_back_to_hwmon() {
        let dir = fake_roots();
        let hwmon = dir.path().join("sys/class/hwmon/hwmon0");
        fs::create_dir_all(&hwmon).unwrap();
        fs::write(hwmon.join("temp1_input"), "61500\n").unwrap();

        let mut probe =
            ProcfsProbe::with_roots(dir.path().join("proc"), dir.path().join("sys"), "/");
        assert_eq!(probe.sample(Metric::Temperature).unwrap(), 61.5);
    }

    #[test]
    fn test_temperature_unavailable_without_sensors() {
        let dir = fake_roots();
        let mut probe =
            ProcfsProbe::with_roots(dir.path().join("proc"), dir.path().join("sys"), "/");
        assert!(matches!(
            probe.sample(Metric::Temperature),
            Err(ProbeError::Unavailable(Metric::Temperature))
        ));
    }

    #[test]
    fn test_disk_usage_of_root_is_a_percentage() {
        let used = statvfs_used_percent("/").unwrap();
        assert!((0.0..=100.0).contains(&used));
    }
}
