//! Snapshots command implementation.
//!
//! Lists stored snapshot records, or summarizes the one a restart would load.

use anyhow::Context;

use herakles_forecast_monitor::metric::Metric;
use herakles_forecast_monitor::snapshot::SnapshotStore;

/// Lists snapshots in `store`, oldest first.
pub fn command_snapshots(store: &SnapshotStore, latest: bool) -> anyhow::Result<()> {
    if latest {
        return print_latest(store);
    }

    if !store.dir().exists() {
        println!("No snapshots yet ({} does not exist)", store.dir().display());
        return Ok(());
    }

    let files = store
        .list()
        .with_context(|| format!("Failed to list snapshots in {}", store.dir().display()))?;

    println!("📦 Snapshots in {}", store.dir().display());
    if files.is_empty() {
        println!("   (none)");
        return Ok(());
    }

    let total: u64 = files.iter().map(|f| f.size_bytes).sum();
    for file in &files {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("   {:<48} {:>10} bytes", name, file.size_bytes);
    }
    println!("\n   {} file(s), {} bytes total", files.len(), total);

    Ok(())
}

fn print_latest(store: &SnapshotStore) -> anyhow::Result<()> {
    match store.load_latest() {
        Some(snapshot) => {
            println!("📦 Latest snapshot");
            println!("   Created: {}", snapshot.created_at.to_rfc3339());
            for metric in Metric::ALL {
                let samples = snapshot.histories.get(&metric).map_or(0, Vec::len);
                println!("   {:<12} {} samples", metric.name(), samples);
            }
            println!("   Total:       {} samples", snapshot.sample_count());
        }
        None => println!("No readable snapshot in {}", store.dir().display()),
    }
    Ok(())
}
