//! Sample command implementation.
//!
//! Probes every metric a number of times and prints the readings, without
//! touching history or snapshots.

use std::thread;
use std::time::{Duration, Instant};

use herakles_forecast_monitor::metric::{Metric, Reading};
use herakles_forecast_monitor::probe::{platform_probe, MetricProbe};

/// Probes every metric `iterations` times, `interval` apart.
pub fn command_sample(iterations: usize, json: bool, interval: Duration) -> anyhow::Result<()> {
    let mut probe = platform_probe();

    if !json {
        println!("🧪 Herakles Forecast Monitor - Sample Mode");
        println!("==========================================");
        println!("Probe: {}", probe.name());
    }

    for iteration in 1..=iterations {
        let start = Instant::now();
        let readings = sample_all(probe.as_mut());
        let elapsed = start.elapsed();

        if json {
            let record: serde_json::Map<String, serde_json::Value> = readings
                .iter()
                .map(|r| (r.metric.name().to_string(), serde_json::json!(r.value)))
                .collect();
            println!("{}", serde_json::Value::Object(record));
        } else {
            println!("\n🔄 Iteration {}/{} ({:.1} ms):", iteration, iterations, elapsed.as_secs_f64() * 1000.0);
            for reading in &readings {
                match reading.value {
                    Some(value) => println!(
                        "   ├─ {:<12} {:.1}{}",
                        reading.metric.name(),
                        value,
                        reading.metric.unit()
                    ),
                    None => println!("   ├─ {:<12} not available", reading.metric.name()),
                }
            }
        }

        if iteration < iterations {
            thread::sleep(interval);
        }
    }

    Ok(())
}

fn sample_all(probe: &mut dyn MetricProbe) -> Vec<Reading> {
    Metric::ALL
        .iter()
        .map(|&metric| match probe.sample(metric) {
            Ok(value) if value.is_finite() => Reading::observed(metric, value),
            _ => Reading::unavailable(metric),
        })
        .collect()
}
