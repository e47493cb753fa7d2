//! Check command implementation.
//!
//! Validates configuration and runtime requirements.

use herakles_forecast_monitor::config::Config;
use herakles_forecast_monitor::metric::Metric;
use herakles_forecast_monitor::probe::{platform_probe, MetricProbe};
use herakles_forecast_monitor::snapshot::SnapshotStore;

use crate::startup_checks::{check_data_dir, check_probe_sources};

/// Validates configuration and runtime requirements.
///
/// Returns `Ok(false)` when any check failed.
pub fn command_check(config: &Config) -> anyhow::Result<bool> {
    println!("🔍 Herakles Forecast Monitor - System Check");
    println!("===========================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match config.validate() {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📁 Checking data directory...");
    match check_data_dir(&config.data_dir) {
        Ok(_) => println!("   ✅ {} is writable", config.data_dir.display()),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    let store = SnapshotStore::new(&config.data_dir);
    match store.list() {
        Ok(files) => println!("   ✅ {} snapshot(s) stored", files.len()),
        Err(e) => println!("   ⚠️  Cannot list snapshots: {}", e),
    }

    println!("\n📊 Checking metric probes...");
    if let Err(e) = check_probe_sources() {
        println!("   ❌ {}", e);
        all_ok = false;
    }

    let mut probe = platform_probe();
    for metric in Metric::ALL {
        match probe.sample(metric) {
            Ok(value) => println!("   ✅ {:<12} {:.1}{}", metric.name(), value, metric.unit()),
            Err(e) if metric.may_be_absent() => {
                println!("   ⚠️  {:<12} unavailable ({})", metric.name(), e)
            }
            Err(e) => {
                println!("   ❌ {:<12} {}", metric.name(), e);
                all_ok = false;
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - monitor is ready");
    } else {
        println!("   ❌ Some checks failed - please review the output above");
    }

    Ok(all_ok)
}
