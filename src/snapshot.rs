//! Durable snapshots of the metric histories.
//!
//! Every save writes a new JSON record into the data directory. Records are
//! never rewritten in place: the content goes to a temporary file first and is
//! then persisted under a fresh name without clobbering, so a reader never
//! observes a partially written record. File names are derived from the
//! record timestamp with fixed width, so lexicographic order is chronological
//! order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::metric::Metric;

/// File name prefix of snapshot records.
pub const SNAPSHOT_PREFIX: &str = "snapshot_";
/// File name extension of snapshot records.
pub const SNAPSHOT_EXTENSION: &str = ".json";

/// Maximum sequence suffix tried when several saves share a timestamp.
const MAX_SEQUENCE: u32 = 999;

/// Errors raised while writing or reading snapshot records.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot record {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No free snapshot file name left for timestamp {0}")]
    NameExhausted(String),
}

/// An immutable record of all metric histories at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub created_at: DateTime<Utc>,
    pub histories: BTreeMap<Metric, Vec<f64>>,
}

impl Snapshot {
    /// Total number of samples across all metrics.
    pub fn sample_count(&self) -> usize {
        self.histories.values().map(Vec::len).sum()
    }
}

/// Borrowed view serialized by `save` to avoid cloning the histories.
#[derive(Serialize)]
struct SnapshotRecord<'a> {
    created_at: &'a DateTime<Utc>,
    histories: &'a BTreeMap<Metric, Vec<f64>>,
}

/// A stored snapshot file, as listed by `SnapshotStore::list`.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Directory-backed store of snapshot records.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists all histories as a new record stamped `created_at`.
    ///
    /// Returns the path of the written record.
    #[instrument(skip(self, histories), fields(dir = %self.dir.display()))]
    pub fn save(
        &self,
        histories: &BTreeMap<Metric, Vec<f64>>,
        created_at: DateTime<Utc>,
    ) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let record = SnapshotRecord {
            created_at: &created_at,
            histories,
        };
        let content = serde_json::to_vec_pretty(&record).map_err(|source| SnapshotError::Json {
            path: self.dir.clone(),
            source,
        })?;

        let mut temp = tempfile::Builder::new()
            .prefix(".snapshot-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|source| SnapshotError::Io {
                path: self.dir.clone(),
                source,
            })?;
        temp.write_all(&content)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|source| SnapshotError::Io {
                path: temp.path().to_path_buf(),
                source,
            })?;

        let stamp = file_stamp(&created_at);
        for seq in 0..=MAX_SEQUENCE {
            let target = self.dir.join(snapshot_file_name(&stamp, seq));
            match temp.persist_noclobber(&target) {
                Ok(_) => {
                    info!(
                        "Snapshot saved to {} ({} bytes)",
                        target.display(),
                        content.len()
                    );
                    return Ok(target);
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("Snapshot name {} taken, trying next", target.display());
                    temp = e.file;
                }
                Err(e) => {
                    return Err(SnapshotError::Io {
                        path: target,
                        source: e.error,
                    });
                }
            }
        }

        Err(SnapshotError::NameExhausted(stamp))
    }

    /// Loads the newest readable record, skipping corrupt ones.
    ///
    /// Returns `None` when the directory is missing, empty, or holds only
    /// unreadable records.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn load_latest(&self) -> Option<Snapshot> {
        let files = match self.list() {
            Ok(files) => files,
            Err(e) => {
                debug!("No snapshots available: {}", e);
                return None;
            }
        };

        // list() is sorted oldest first
        for file in files.iter().rev() {
            match read_snapshot(&file.path) {
                Ok(snapshot) => {
                    debug!("Selected snapshot {}", file.path.display());
                    return Some(snapshot);
                }
                Err(e) => {
                    warn!("⚠️  Skipping unreadable snapshot: {}", e);
                }
            }
        }

        None
    }

    /// Lists stored snapshot files, oldest first.
    pub fn list(&self) -> Result<Vec<SnapshotFile>, SnapshotError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| SnapshotError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files: Vec<SnapshotFile> = entries
            .flatten()
            .filter(|entry| is_snapshot_file_name(&entry.file_name().to_string_lossy()))
            .map(|entry| SnapshotFile {
                size_bytes: entry.metadata().map(|m| m.len()).unwrap_or(0),
                path: entry.path(),
            })
            .collect();

        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(files)
    }
}

/// Reads and parses one snapshot record.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let content = fs::read(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Fixed-width UTC timestamp used in file names.
fn file_stamp(created_at: &DateTime<Utc>) -> String {
    created_at.format("%Y%m%dT%H%M%S%.6fZ").to_string()
}

fn snapshot_file_name(stamp: &str, seq: u32) -> String {
    format!("{SNAPSHOT_PREFIX}{stamp}_{seq:03}{SNAPSHOT_EXTENSION}")
}

/// Shape of the name between prefix and extension; `9` stands for any digit.
const STAMP_SHAPE: &str = "99999999T999999.999999Z_999";

fn is_snapshot_file_name(name: &str) -> bool {
    let Some(stem) = name
        .strip_prefix(SNAPSHOT_PREFIX)
        .and_then(|rest| rest.strip_suffix(SNAPSHOT_EXTENSION))
    else {
        return false;
    };

    stem.len() == STAMP_SHAPE.len()
        && stem.bytes().zip(STAMP_SHAPE.bytes()).all(|(c, shape)| match shape {
            b'9' => c.is_ascii_digit(),
            _ => c == shape,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_names_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2026, 9, 30, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();

        let a = snapshot_file_name(&file_stamp(&earlier), 0);
        let b = snapshot_file_name(&file_stamp(&later), 0);
        let c = snapshot_file_name(&file_stamp(&later), 1);

        assert_eq!(a, "snapshot_20260930T235959.000000Z_000.json");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_snapshot_file_name_filter() {
        assert!(is_snapshot_file_name("snapshot_20261018T120000.000000Z_000.json"));
        assert!(!is_snapshot_file_name(".snapshot-abc.tmp"));
        assert!(!is_snapshot_file_name("notes.json"));
        assert!(!is_snapshot_file_name("snapshot_manual.json"));
        assert!(!is_snapshot_file_name("snapshot_20261018T120000Z_000.json"));
        assert!(!is_snapshot_file_name("snapshot_20261018T120000.000000Z_000.json.bak"));
    }

    #[test]
    fn test_sample_count() {
        let mut histories = BTreeMap::new();
        histories.insert(Metric::Cpu, vec![1.0, 2.0]);
        histories.insert(Metric::Disk, vec![3.0]);
        let snapshot = Snapshot {
            created_at: Utc::now(),
            histories,
        };
        assert_eq!(snapshot.sample_count(), 3);
    }
}
