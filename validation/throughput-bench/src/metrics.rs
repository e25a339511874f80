//! Latency statistics for a batch of calls.

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// Upper bound of the histogram, one hour in microseconds.
const HIGHEST_TRACKABLE_MICROS: u64 = 60 * 60 * 1_000_000;

/// Records per-call latencies for one batch.
pub struct LatencyRecorder {
    histogram: Histogram<u64>,
    max: Duration,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self {
            // 1µs to 1h at three significant figures; longer calls clamp to the bound.
            histogram: Histogram::new_with_bounds(1, HIGHEST_TRACKABLE_MICROS, 3)
                .expect("histogram bounds are valid"),
            max: Duration::ZERO,
        }
    }

    pub fn record(&mut self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.histogram.saturating_record(micros);
        self.max = self.max.max(latency);
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    /// Exact slowest latency observed.
    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn stats(&self) -> LatencyStats {
        if self.histogram.is_empty() {
            return LatencyStats::default();
        }
        LatencyStats {
            min_ms: self.histogram.min() as f64 / 1000.0,
            mean_ms: self.histogram.mean() / 1000.0,
            p50_ms: self.histogram.value_at_percentile(50.0) as f64 / 1000.0,
            p90_ms: self.histogram.value_at_percentile(90.0) as f64 / 1000.0,
            p99_ms: self.histogram.value_at_percentile(99.0) as f64 / 1000.0,
            max_ms: self.max.as_secs_f64() * 1000.0,
        }
    }
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency summary in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Requests per second for `request_count` calls completed in `duration`.
pub fn throughput(request_count: usize, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        request_count as f64 / secs
    } else {
        0.0
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
