//! Capped metrics history and response-time sample window.

use std::collections::VecDeque;

use shared_types::{PerformanceMetrics, ResponseTimeStats};

use super::entities::TimeRange;

/// Ring of the most recent snapshots; oldest evicted first.
#[derive(Debug)]
pub struct MetricsHistory {
    entries: VecDeque<PerformanceMetrics>,
    capacity: usize,
}

impl MetricsHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, metrics: PerformanceMetrics) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(metrics);
    }

    pub fn latest(&self) -> Option<&PerformanceMetrics> {
        self.entries.back()
    }

    pub fn in_range(&self, range: TimeRange) -> Vec<PerformanceMetrics> {
        self.entries
            .iter()
            .filter(|m| range.contains(m.collected_at))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Capped window of response times in milliseconds.
#[derive(Debug)]
pub struct ResponseSamples {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl ResponseSamples {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn record(&mut self, millis: f64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(millis);
    }

    /// Aggregates over the current window only.
    pub fn stats(&self) -> ResponseTimeStats {
        if self.samples.is_empty() {
            return ResponseTimeStats::default();
        }
        let (sum, min, max) = self.samples.iter().fold(
            (0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(sum, min, max), &s| (sum + s, min.min(s), max.max(s)),
        );
        ResponseTimeStats {
            samples: self.samples.len(),
            average_ms: sum / self.samples.len() as f64,
            min_ms: min,
            max_ms: max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use shared_types::{CacheStats, PoolStats};

    fn metrics(at: DateTime<Utc>) -> PerformanceMetrics {
        PerformanceMetrics {
            collected_at: at,
            cpu_usage: 1.0,
            memory_used_bytes: 1,
            memory_total_bytes: 2,
            pool: PoolStats::default(),
            cache: CacheStats::default(),
            response_times: ResponseTimeStats::default(),
        }
    }

    #[test]
    fn test_history_is_capped() {
        let t0 = Utc::now();
        let mut history = MetricsHistory::new(3);
        for i in 0..5 {
            history.push(metrics(t0 + Duration::seconds(i)));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest().unwrap().collected_at, t0 + Duration::seconds(4));

        let range = TimeRange::new(t0, t0 + Duration::seconds(2));
        assert_eq!(history.in_range(range).len(), 1);
    }

    #[test]
    fn test_samples_window() {
        let mut samples = ResponseSamples::new(3);
        for ms in [100.0, 1.0, 2.0, 3.0] {
            samples.record(ms);
        }
        let stats = samples.stats();
        assert_eq!(stats.samples, 3);
        assert!((stats.average_ms - 2.0).abs() < f64::EPSILON);
        assert!((stats.max_ms - 3.0).abs() < f64::EPSILON);
        assert!((stats.min_ms - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(ResponseSamples::new(5).stats(), ResponseTimeStats::default());
    }
}
