//! Ringbuffer module for per-metric sample history.
//!
//! This module provides a fixed-capacity ringbuffer of samples with
//! predictable memory usage, and `MetricRings`, the set of one ringbuffer per
//! metric owned by the monitor.

use std::collections::BTreeMap;

use crate::metric::Metric;

/// Default number of samples kept per metric.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// A circular buffer of samples with fixed capacity.
///
/// Samples are kept in insertion order; once the buffer is full the oldest
/// sample is overwritten.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    entries: Vec<f64>,
    capacity: usize,
    write_index: usize,
    count: usize,
}

impl HistoryRing {
    /// Creates a new ringbuffer with the specified capacity (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            entries: vec![0.0; capacity],
            capacity,
            write_index: 0,
            count: 0,
        }
    }

    /// Appends a sample, evicting the oldest one if the buffer is full.
    pub fn append(&mut self, value: f64) {
        self.entries[self.write_index] = value;
        self.write_index = (self.write_index + 1) % self.capacity;

        if self.count < self.capacity {
            self.count += 1;
        }
    }

    /// Returns all samples in chronological order (oldest to newest).
    pub fn snapshot(&self) -> Vec<f64> {
        if self.count == 0 {
            return Vec::new();
        }

        let mut result = Vec::with_capacity(self.count);

        if self.count < self.capacity {
            // Not yet wrapped, samples are in order from 0 to count-1
            result.extend_from_slice(&self.entries[0..self.count]);
        } else {
            // Wrapped: write_index points at the oldest sample
            result.extend_from_slice(&self.entries[self.write_index..]);
            result.extend_from_slice(&self.entries[0..self.write_index]);
        }

        result
    }

    /// Returns the most recently appended sample.
    pub fn latest(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let index = (self.write_index + self.capacity - 1) % self.capacity;
        Some(self.entries[index])
    }

    /// Returns the current number of samples in the buffer.
    pub fn size(&self) -> usize {
        self.count
    }

    /// Returns the maximum capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// One history ringbuffer per metric.
#[derive(Debug, Clone)]
pub struct MetricRings {
    rings: BTreeMap<Metric, HistoryRing>,
    capacity: usize,
}

impl MetricRings {
    /// Creates empty rings for every metric with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let rings = Metric::ALL
            .iter()
            .map(|&metric| (metric, HistoryRing::new(capacity)))
            .collect();

        Self { rings, capacity }
    }

    /// Appends a sample to the ring of `metric`.
    pub fn record(&mut self, metric: Metric, value: f64) {
        self.rings
            .entry(metric)
            .or_insert_with(|| HistoryRing::new(self.capacity))
            .append(value);
    }

    /// Seeds the rings from previously persisted histories.
    ///
    /// Histories longer than the capacity keep only their newest samples.
    /// Returns the number of samples restored across all metrics.
    pub fn restore(&mut self, histories: &BTreeMap<Metric, Vec<f64>>) -> usize {
        let mut restored = 0;
        for (&metric, values) in histories {
            let skip = values.len().saturating_sub(self.capacity);
            for &value in &values[skip..] {
                self.record(metric, value);
                restored += 1;
            }
        }
        restored
    }

    /// Returns the ring of a metric.
    pub fn get(&self, metric: Metric) -> Option<&HistoryRing> {
        self.rings.get(&metric)
    }

    /// Returns a copy of one metric's history in chronological order.
    pub fn history(&self, metric: Metric) -> Vec<f64> {
        self.rings
            .get(&metric)
            .map(HistoryRing::snapshot)
            .unwrap_or_default()
    }

    /// Returns the number of samples held for a metric.
    pub fn size(&self, metric: Metric) -> usize {
        self.rings.get(&metric).map_or(0, HistoryRing::size)
    }

    /// Returns copies of every metric's history.
    pub fn snapshot_all(&self) -> BTreeMap<Metric, Vec<f64>> {
        self.rings
            .iter()
            .map(|(&metric, ring)| (metric, ring.snapshot()))
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ringbuffer_append_and_read() {
        let mut rb = HistoryRing::new(3);

        assert_eq!(rb.size(), 0);
        assert_eq!(rb.capacity(), 3);

        rb.append(12.5);

        assert_eq!(rb.size(), 1);
        assert_eq!(rb.snapshot(), vec![12.5]);
        assert_eq!(rb.latest(), Some(12.5));
    }

    #[test]
    fn test_ringbuffer_chronological_order() {
        let mut rb = HistoryRing::new(3);

        for i in 0..3 {
            rb.append(i as f64);
        }

        assert_eq!(rb.snapshot(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ringbuffer_wraparound() {
        let mut rb = HistoryRing::new(3);

        // Push 5 samples (will wrap around)
        for i in 0..5 {
            rb.append(i as f64);
        }

        // Should only have the last 3 samples in chronological order
        assert_eq!(rb.size(), 3);
        assert_eq!(rb.snapshot(), vec![2.0, 3.0, 4.0]);
        assert_eq!(rb.latest(), Some(4.0));
    }

    #[test]
    fn test_ringbuffer_empty() {
        let rb = HistoryRing::new(10);
        assert_eq!(rb.size(), 0);
        assert!(rb.is_empty());
        assert!(rb.snapshot().is_empty());
        assert_eq!(rb.latest(), None);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut rb = HistoryRing::new(0);
        rb.append(1.0);
        rb.append(2.0);
        assert_eq!(rb.capacity(), 1);
        assert_eq!(rb.snapshot(), vec![2.0]);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut rb = HistoryRing::new(4);
        rb.append(1.0);
        rb.append(2.0);
        let first = rb.snapshot();
        let second = rb.snapshot();
        assert_eq!(first, second);
        assert_eq!(rb.size(), 2);
    }

    #[test]
    fn test_metric_rings_cover_all_metrics() {
        let rings = MetricRings::new(5);
        for metric in Metric::ALL {
            assert_eq!(rings.size(metric), 0);
            assert_eq!(rings.get(metric).map(HistoryRing::capacity), Some(5));
        }
    }

    #[test]
    fn test_restore_keeps_newest_samples() {
        let mut rings = MetricRings::new(3);
        let mut histories = BTreeMap::new();
        histories.insert(Metric::Cpu, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        histories.insert(Metric::Temperature, vec![40.0]);

        let restored = rings.restore(&histories);

        assert_eq!(restored, 4);
        assert_eq!(rings.history(Metric::Cpu), vec![3.0, 4.0, 5.0]);
        assert_eq!(rings.history(Metric::Temperature), vec![40.0]);
        assert!(rings.history(Metric::Memory).is_empty());
    }
}
