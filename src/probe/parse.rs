//! Parsers for the raw text the probes read.
//!
//! Kept free of I/O so every platform's parsing is tested on every platform.

use super::ProbeError;

/// CPU time counters from the aggregate `cpu` line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Calculate non-active time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy percentage between `previous` and `self`.
    ///
    /// Returns `None` when no time elapsed between the two readings.
    pub fn usage_percent_since(&self, previous: &CpuStat) -> Option<f64> {
        let delta_total = self.total().saturating_sub(previous.total());
        let delta_idle = self.idle_total().saturating_sub(previous.idle_total());
        if delta_total == 0 {
            return None;
        }
        Some((delta_total.saturating_sub(delta_idle)) as f64 / delta_total as f64 * 100.0)
    }
}

/// Parses the aggregate `cpu ` line of /proc/stat.
pub fn parse_proc_stat(content: &str) -> Result<CpuStat, ProbeError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| ProbeError::parse("/proc/stat", "no aggregate cpu line"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| ProbeError::parse("/proc/stat", e))?;

    if fields.len() < 7 {
        return Err(ProbeError::parse(
            "/proc/stat",
            format!("expected at least 7 cpu fields, got {}", fields.len()),
        ));
    }

    Ok(CpuStat {
        user: fields[0],
        nice: fields[1],
        system: fields[2],
        idle: fields[3],
        iowait: fields[4],
        irq: fields[5],
        softirq: fields[6],
        steal: fields.get(7).copied().unwrap_or(0),
    })
}

/// Parses /proc/meminfo into a used-memory percentage.
///
/// Used memory is `MemTotal - MemAvailable`.
pub fn parse_meminfo_used_percent(content: &str) -> Result<f64, ProbeError> {
    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = rest.split_whitespace().next().and_then(|v| v.parse().ok());
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = rest.split_whitespace().next().and_then(|v| v.parse().ok());
        }
        if total_kb.is_some() && available_kb.is_some() {
            break;
        }
    }

    match (total_kb, available_kb) {
        (Some(total), Some(available)) if total > 0 => {
            let used = total.saturating_sub(available);
            Ok(used as f64 / total as f64 * 100.0)
        }
        _ => Err(ProbeError::parse(
            "/proc/meminfo",
            "MemTotal/MemAvailable missing",
        )),
    }
}

/// Parses a sysfs millidegree temperature file into Celsius.
pub fn parse_millidegrees(content: &str) -> Result<f64, ProbeError> {
    content
        .trim()
        .parse::<i64>()
        .map(|millidegrees| millidegrees as f64 / 1000.0)
        .map_err(|e| ProbeError::parse("thermal sensor", e))
}

/// Parses the `CPU usage:` line of macOS `top -l 1` into a busy percentage.
///
/// Example: `CPU usage: 10.64% user, 14.35% sys, 75.00% idle`
pub fn parse_top_cpu_percent(output: &str) -> Result<f64, ProbeError> {
    let line = output
        .lines()
        .find(|l| l.contains("CPU usage"))
        .ok_or_else(|| ProbeError::parse("top output", "no 'CPU usage' line"))?;

    let idle = line
        .split(',')
        .find(|part| part.contains("idle"))
        .and_then(|part| part.split_whitespace().next())
        .map(|v| v.trim_end_matches('%'))
        .ok_or_else(|| ProbeError::parse("top output", "no idle field"))?
        .parse::<f64>()
        .map_err(|e| ProbeError::parse("top idle field", e))?;

    Ok(100.0 - idle)
}

/// Parses macOS `vm_stat` output into a used-memory percentage.
///
/// Used pages are active + wired; free pages are free + inactive + speculative.
pub fn parse_vm_stat_used_percent(output: &str) -> Result<f64, ProbeError> {
    let pages = |label: &str| -> Option<u64> {
        output
            .lines()
            .find(|l| l.starts_with(label))
            .and_then(|l| l.split(':').nth(1))
            .and_then(|v| v.trim().trim_end_matches('.').parse().ok())
    };

    let free = pages("Pages free").unwrap_or(0)
        + pages("Pages inactive").unwrap_or(0)
        + pages("Pages speculative").unwrap_or(0);
    let used = pages("Pages active").unwrap_or(0) + pages("Pages wired down").unwrap_or(0);

    let total = free + used;
    if total == 0 {
        return Err(ProbeError::parse("vm_stat output", "no page counters"));
    }
    Ok(used as f64 / total as f64 * 100.0)
}

/// Extracts the capacity percentage of the first filesystem row of `df` output.
pub fn parse_df_percent(output: &str) -> Result<f64, ProbeError> {
    let row = output
        .lines()
        .nth(1)
        .ok_or_else(|| ProbeError::parse("df output", "no filesystem row"))?;

    row.split_whitespace()
        .find(|field| field.ends_with('%'))
        .ok_or_else(|| ProbeError::parse("df output", "no percentage column"))?
        .trim_end_matches('%')
        .parse::<f64>()
        .map_err(|e| ProbeError::parse("df percentage", e))
}

/// Parses `osx-cpu-temp` output such as `CPU: 45.6°C`.
pub fn parse_osx_cpu_temp(output: &str) -> Result<f64, ProbeError> {
    output
        .split("CPU:")
        .nth(1)
        .and_then(|rest| rest.split("°C").next())
        .ok_or_else(|| ProbeError::parse("osx-cpu-temp output", "unexpected format"))?
        .trim()
        .parse::<f64>()
        .map_err(|e| ProbeError::parse("osx-cpu-temp value", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_STAT: &str = "cpu  4705 356 584 3699 23 23 0 0 0 0\n\
                             cpu0 1393 280 287 910 6 4 0 0 0 0\n\
                             intr 114930548 113199788 3 0 5 263 0 4\n";

    #[test]
    fn test_parse_proc_stat() {
        let stat = parse_proc_stat(PROC_STAT).unwrap();
        assert_eq!(stat.user, 4705);
        assert_eq!(stat.idle, 3699);
        assert_eq!(stat.steal, 0);
        assert_eq!(stat.total(), 4705 + 356 + 584 + 3699 + 23 + 23);
    }

    #[test]
    fn test_parse_proc_stat_missing_line() {
        assert!(parse_proc_stat("intr 1 2 3\n").is_err());
    }

    #[test]
    fn test_cpu_usage_between_readings() {
        let previous = CpuStat {
            user: 100,
            idle: 100,
            ..CpuStat::default()
        };
        let current = CpuStat {
            user: 130,
            idle: 170,
            ..CpuStat::default()
        };
        let usage = current.usage_percent_since(&previous).unwrap();
        assert!((usage - 30.0).abs() < 1e-9);
        assert_eq!(current.usage_percent_since(&current), None);
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:       16000000 kB\n\
                       MemFree:         1000000 kB\n\
                       MemAvailable:    4000000 kB\n";
        let used = parse_meminfo_used_percent(content).unwrap();
        assert!((used - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_meminfo_missing_available() {
        assert!(parse_meminfo_used_percent("MemTotal: 100 kB\n").is_err());
    }

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_millidegrees("45500\n").unwrap(), 45.5);
        assert!(parse_millidegrees("n/a").is_err());
    }

    #[test]
    fn test_parse_top_cpu_percent() {
        let output = "Processes: 512 total\n\
                      CPU usage: 10.64% user, 14.36% sys, 75.00% idle\n";
        let busy = parse_top_cpu_percent(output).unwrap();
        assert!((busy - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_vm_stat() {
        let output = "Mach Virtual Memory Statistics: (page size of 4096 bytes)\n\
                      Pages free:                               100.\n\
                      Pages active:                             200.\n\
                      Pages inactive:                            50.\n\
                      Pages speculative:                         50.\n\
                      Pages wired down:                         100.\n";
        let used = parse_vm_stat_used_percent(output).unwrap();
        assert!((used - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_df_percent() {
        let linux = "Filesystem     1K-blocks     Used Available Use% Mounted on\n\
                     /dev/nvme0n1p2 490617784 91234567 374390000  20% /\n";
        assert_eq!(parse_df_percent(linux).unwrap(), 20.0);

        let macos = "Filesystem     512-blocks      Used Available Capacity iused ifree %iused  Mounted on\n\
                     /dev/disk3s1s1  965595304  19955904 493812760     4%  403847 2469063800    0%   /\n";
        assert_eq!(parse_df_percent(macos).unwrap(), 4.0);

        assert!(parse_df_percent("Filesystem\n").is_err());
    }

    #[test]
    fn test_parse_osx_cpu_temp() {
        assert_eq!(parse_osx_cpu_temp("CPU: 45.6°C\n").unwrap(), 45.6);
        assert!(parse_osx_cpu_temp("garbage").is_err());
    }
}
