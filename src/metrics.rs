// Performance metrics for pricing and scheduling
//
// Tracks execution times, cache hit rates, and slow operations
// to help identify performance bottlenecks.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Performance threshold for slow operations (100ms)
const SLOW_OPERATION_THRESHOLD_MS: u64 = 100;

/// Kind of operation being timed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Pricing,
    Quote,
    Availability,
    SlotSearch,
}

impl OperationType {
    fn label(&self) -> &'static str {
        match self {
            OperationType::Pricing => "pricing calculation",
            OperationType::Quote => "quote calculation",
            OperationType::Availability => "availability check",
            OperationType::SlotSearch => "slot search",
        }
    }
}

#[derive(Debug, Default)]
struct OperationStats {
    count: AtomicU64,
    total_time_us: AtomicU64,
    slow: AtomicU64,
}

impl OperationStats {
    fn record(&self, duration: Duration, label: &str) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if duration.as_millis() as u64 > SLOW_OPERATION_THRESHOLD_MS {
            self.slow.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Slow {}: {}ms", label, duration.as_millis());
        }
    }

    fn summary(&self) -> OperationSummary {
        let count = self.count.load(Ordering::Relaxed);
        let total_us = self.total_time_us.load(Ordering::Relaxed);
        let avg_time_ms = if count == 0 {
            0.0
        } else {
            (total_us as f64 / count as f64) / 1000.0
        };

        OperationSummary {
            count,
            avg_time_ms,
            slow: self.slow.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    pricing: OperationStats,
    quotes: OperationStats,
    availability: OperationStats,
    slot_search: OperationStats,
}

/// Shared performance counters; clones point at the same counters
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    inner: Arc<MetricsInner>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get cache hit rate (0.0 to 1.0)
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.inner.cache_hits.load(Ordering::Relaxed);
        let misses = self.inner.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Start timing an operation; the duration is recorded when the timer drops
    pub fn start(&self, operation: OperationType) -> OperationTimer {
        OperationTimer {
            start: Instant::now(),
            operation,
            metrics: self.clone(),
        }
    }

    fn stats(&self, operation: OperationType) -> &OperationStats {
        match operation {
            OperationType::Pricing => &self.inner.pricing,
            OperationType::Quote => &self.inner.quotes,
            OperationType::Availability => &self.inner.availability,
            OperationType::SlotSearch => &self.inner.slot_search,
        }
    }

    fn record(&self, operation: OperationType, duration: Duration) {
        self.stats(operation).record(duration, operation.label());
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cache_hit_rate: self.cache_hit_rate(),
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.inner.cache_misses.load(Ordering::Relaxed),
            pricing: self.inner.pricing.summary(),
            quotes: self.inner.quotes.summary(),
            availability: self.inner.availability.summary(),
            slot_search: self.inner.slot_search.summary(),
        }
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        tracing::info!(
            "Booking Performance Metrics:\n\
             Cache: {:.1}% hit rate ({} hits, {} misses)\n\
             Pricing: {} calculations, avg {:.2}ms, {} slow\n\
             Quotes: {} calculations, avg {:.2}ms, {} slow\n\
             Availability: {} checks, avg {:.2}ms, {} slow\n\
             Slot search: {} searches, avg {:.2}ms, {} slow",
            summary.cache_hit_rate * 100.0,
            summary.cache_hits,
            summary.cache_misses,
            summary.pricing.count,
            summary.pricing.avg_time_ms,
            summary.pricing.slow,
            summary.quotes.count,
            summary.quotes.avg_time_ms,
            summary.quotes.slow,
            summary.availability.count,
            summary.availability.avg_time_ms,
            summary.availability.slow,
            summary.slot_search.count,
            summary.slot_search.avg_time_ms,
            summary.slot_search.slow,
        );
    }
}

/// Timer for tracking operation duration
pub struct OperationTimer {
    start: Instant,
    operation: OperationType,
    metrics: PerformanceMetrics,
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        self.metrics.record(self.operation, self.start.elapsed());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub count: u64,
    pub avg_time_ms: f64,
    pub slow: u64,
}

/// Summary of performance metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub cache_hit_rate: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub pricing: OperationSummary,
    pub quotes: OperationSummary,
    pub availability: OperationSummary,
    pub slot_search: OperationSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = PerformanceMetrics::new();
        assert_eq!(metrics.cache_hit_rate(), 0.0);
        assert_eq!(metrics.summary().availability.avg_time_ms, 0.0);
    }

    #[test]
    fn test_cache_metrics() {
        let metrics = PerformanceMetrics::new();

        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        assert_eq!(metrics.cache_hit_rate(), 2.0 / 3.0);
    }

    #[test]
    fn test_timer_records_once() {
        let metrics = PerformanceMetrics::new();

        {
            let _timer = metrics.start(OperationType::Availability);
            thread::sleep(Duration::from_millis(10));
        }

        let summary = metrics.summary();
        assert_eq!(summary.availability.count, 1);
        assert!(summary.availability.avg_time_ms >= 10.0);
        assert_eq!(summary.pricing.count, 0);
    }

    #[test]
    fn test_slow_operation_detection() {
        let metrics = PerformanceMetrics::new();

        {
            let _timer = metrics.start(OperationType::Pricing);
            thread::sleep(Duration::from_millis(150));
        }

        let summary = metrics.summary();
        assert_eq!(summary.pricing.slow, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = PerformanceMetrics::new();
        let clone = metrics.clone();

        drop(clone.start(OperationType::SlotSearch));

        assert_eq!(metrics.summary().slot_search.count, 1);
    }
}
