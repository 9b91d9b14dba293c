//! Logger metrics for observability
//!
//! Provides counters for monitoring logger health: delivered and filtered
//! records, per-sink failures, deferred-queue pressure, and alarm activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use fanlog::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_logged();
/// metrics.record_sink_failure();
/// assert_eq!(metrics.total_logged(), 1);
/// assert_eq!(metrics.sink_failures(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records that reached at least one sink
    total_logged: AtomicU64,

    /// Records filtered out by every sink's threshold
    total_filtered: AtomicU64,

    /// Individual sink write failures
    sink_failures: AtomicU64,

    /// Times the deferred queue was full
    queue_full_events: AtomicU64,

    /// Deferred writes dropped because the queue was full
    deferred_dropped: AtomicU64,

    /// Alarms dispatched
    alarms_fired: AtomicU64,

    /// Alarms suppressed by the throttle window
    alarms_suppressed: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            total_logged: AtomicU64::new(0),
            total_filtered: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            deferred_dropped: AtomicU64::new(0),
            alarms_fired: AtomicU64::new(0),
            alarms_suppressed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_filtered(&self) -> u64 {
        self.total_filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn deferred_dropped(&self) -> u64 {
        self.deferred_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn alarms_fired(&self) -> u64 {
        self.alarms_fired.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn alarms_suppressed(&self) -> u64 {
        self.alarms_suppressed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.total_filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_deferred_dropped(&self) -> u64 {
        self.deferred_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_alarm_fired(&self) -> u64 {
        self.alarms_fired.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_alarms_suppressed(&self, count: u64) -> u64 {
        self.alarms_suppressed.fetch_add(count, Ordering::Relaxed)
    }

    /// Sink failure rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no records have been processed.
    pub fn failure_rate(&self) -> f64 {
        let failures = self.sink_failures() as f64;
        let total = self.total_logged() as f64 + failures;
        if total == 0.0 {
            0.0
        } else {
            (failures / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    ///
    /// Useful for testing or periodic reset of metrics.
    pub fn reset(&self) {
        self.total_logged.store(0, Ordering::Relaxed);
        self.total_filtered.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.deferred_dropped.store(0, Ordering::Relaxed);
        self.alarms_fired.store(0, Ordering::Relaxed);
        self.alarms_suppressed.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            total_logged: AtomicU64::new(self.total_logged()),
            total_filtered: AtomicU64::new(self.total_filtered()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            deferred_dropped: AtomicU64::new(self.deferred_dropped()),
            alarms_fired: AtomicU64::new(self.alarms_fired()),
            alarms_suppressed: AtomicU64::new(self.alarms_suppressed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.total_logged(), 0);
        assert_eq!(metrics.sink_failures(), 0);
        assert_eq!(metrics.alarms_fired(), 0);
    }

    #[test]
    fn test_metrics_counters() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        metrics.record_logged();
        metrics.record_sink_failure();
        metrics.record_alarm_fired();
        metrics.record_alarms_suppressed(4);

        assert_eq!(metrics.total_logged(), 2);
        assert_eq!(metrics.sink_failures(), 1);
        assert_eq!(metrics.alarms_fired(), 1);
        assert_eq!(metrics.alarms_suppressed(), 4);
    }

    #[test]
    fn test_failure_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.failure_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_logged();
        }
        for _ in 0..10 {
            metrics.record_sink_failure();
        }

        let rate = metrics.failure_rate();
        assert!((9.9..=10.1).contains(&rate), "failure rate was {}", rate);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        metrics.record_queue_full();
        metrics.reset();
        assert_eq!(metrics.total_logged(), 0);
        assert_eq!(metrics.queue_full_events(), 0);
    }

    #[test]
    fn test_metrics_clone_snapshot() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        let snapshot = metrics.clone();
        metrics.record_logged();
        assert_eq!(snapshot.total_logged(), 1);
        assert_eq!(metrics.total_logged(), 2);
    }
}
